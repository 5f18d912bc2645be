// vim: tw=80
//! The validated shape of a mock: the traits it implements, and their
//! methods.
use proc_macro2::{Span, TokenStream, TokenTree};
use quote::{format_ident, quote, ToTokens};
use syn::{
    braced,
    ext::IdentExt,
    parse::{Parse, ParseStream},
    spanned::Spanned,
    Attribute,
    FnArg,
    Ident,
    ItemTrait,
    Pat,
    Path,
    ReturnType,
    Signature,
    Token,
    TraitItem,
    Type,
    TypeParamBound,
    Visibility
};

/// An error for something that cannot be mocked.
pub(crate) fn unsupported(span: Span, what: &str) -> syn::Error {
    syn::Error::new(span, format!("unsupported mock target: {}", what))
}

/// Does any token of `tokens`, at any depth, satisfy `f`?
fn scan(tokens: TokenStream, f: &dyn Fn(&TokenTree) -> bool) -> bool {
    tokens.into_iter().any(|tt| match &tt {
        TokenTree::Group(g) => scan(g.stream(), f),
        other => f(other)
    })
}

/// Does the type contain a reference or a lifetime?
fn borrows(ty: &Type) -> bool {
    scan(ty.to_token_stream(), &|tt| matches!(tt,
        TokenTree::Punct(p) if p.as_char() == '&' || p.as_char() == '\''))
}

fn mentions_self(ty: &Type) -> bool {
    scan(ty.to_token_stream(), &|tt| matches!(tt,
        TokenTree::Ident(i) if i == "Self"))
}

fn mentions_impl(ty: &Type) -> bool {
    scan(ty.to_token_stream(), &|tt| matches!(tt,
        TokenTree::Ident(i) if i == "impl"))
}

/// Render a type for diagnostics, without proc_macro2's token spacing.
pub(crate) fn type_name(ty: &Type) -> String {
    let raw = ty.to_token_stream().to_string();
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    for (i, c) in chars.iter().enumerate() {
        if *c == ' ' {
            let prev = if i > 0 { chars[i - 1] } else { ' ' };
            let next = chars.get(i + 1).copied().unwrap_or(' ');
            if !",;".contains(prev) &&
                ("&(<[:".contains(prev) || ",;)>]:(<".contains(next))
            {
                continue;
            }
        }
        out.push(*c);
    }
    out
}

/// One parameter of a mocked method.
pub(crate) struct Param {
    pub ident: Ident,
    pub ty: Type,
    /// The owned type that is recorded and matched.
    pub recorded: Type,
    /// Produces the recorded value from the parameter.
    pub record: TokenStream,
}

impl Param {
    fn new(ident: Ident, ty: &Type) -> syn::Result<Self> {
        if mentions_impl(ty) {
            return Err(unsupported(ty.span(), "impl Trait arguments"));
        }
        if mentions_self(ty) {
            return Err(unsupported(ty.span(), "arguments mentioning Self"));
        }
        let (recorded, record) = match ty {
            Type::Reference(r) => {
                let elem = &r.elem;
                if let Type::TraitObject(_) = **elem {
                    return Err(unsupported(ty.span(),
                        "trait object arguments"));
                }
                if borrows(elem) {
                    return Err(unsupported(ty.span(), "nested references"));
                }
                let recorded: Type = syn::parse_quote!(
                    <#elem as ::std::borrow::ToOwned>::Owned
                );
                let record = quote!(
                    ::std::borrow::ToOwned::to_owned(&*#ident)
                );
                (recorded, record)
            },
            _ => {
                if borrows(ty) {
                    return Err(unsupported(ty.span(),
                        "non-'static argument types"));
                }
                (ty.clone(), quote!(::std::clone::Clone::clone(&#ident)))
            }
        };
        Ok(Param { ident, ty: ty.clone(), recorded, record })
    }
}

/// One mocked method.
pub(crate) struct MethodDef {
    /// `#[cfg]` attributes, which the generated items must share.
    pub attrs: Vec<Attribute>,
    pub unsafety: Option<Token![unsafe]>,
    pub ident: Ident,
    /// Whether the receiver is `&mut self`.
    pub mutable: bool,
    pub params: Vec<Param>,
    /// The return type, `()` if none is written.
    pub output: Type,
    /// The return type as written.
    pub returns: ReturnType,
}

impl MethodDef {
    fn new(attrs: &[Attribute], sig: &Signature) -> syn::Result<Self> {
        if sig.asyncness.is_some() {
            return Err(unsupported(sig.span(), "async methods"));
        }
        if sig.constness.is_some() {
            return Err(unsupported(sig.span(), "const methods"));
        }
        if sig.abi.is_some() {
            return Err(unsupported(sig.span(), "extern methods"));
        }
        if !sig.generics.params.is_empty() ||
            sig.generics.where_clause.is_some()
        {
            return Err(unsupported(sig.generics.span(), "generic methods"));
        }
        if let Some(v) = &sig.variadic {
            return Err(unsupported(v.span(), "variadic methods"));
        }
        let mutable = match sig.inputs.first() {
            Some(FnArg::Receiver(r)) if r.colon_token.is_some() => {
                return Err(unsupported(r.span(),
                    "receivers other than &self and &mut self"));
            },
            Some(FnArg::Receiver(r)) => match &r.reference {
                Some((_, Some(lt))) => {
                    return Err(unsupported(lt.span(),
                        "receivers with explicit lifetimes"));
                },
                Some((_, None)) => r.mutability.is_some(),
                None => {
                    return Err(unsupported(r.span(),
                        "methods taking self by value"));
                }
            },
            _ => return Err(unsupported(sig.span(), "static methods"))
        };
        let mut params = Vec::new();
        for (i, input) in sig.inputs.iter().enumerate().skip(1) {
            let FnArg::Typed(pt) = input else {
                return Err(unsupported(input.span(), "multiple receivers"));
            };
            let ident = match &*pt.pat {
                Pat::Ident(pi) if pi.by_ref.is_none() && pi.subpat.is_none() =>
                {
                    pi.ident.clone()
                },
                Pat::Wild(_) => format_ident!("__understudy_arg{}", i),
                _ => return Err(unsupported(pt.pat.span(),
                    "argument patterns"))
            };
            params.push(Param::new(ident, &pt.ty)?);
        }
        let output = match &sig.output {
            ReturnType::Default => syn::parse_quote!(()),
            ReturnType::Type(_, ty) => {
                check_output(ty)?;
                (**ty).clone()
            }
        };
        let attrs = attrs.iter()
            .filter(|a| a.path().is_ident("cfg"))
            .cloned()
            .collect();
        Ok(MethodDef {
            attrs,
            unsafety: sig.unsafety,
            ident: sig.ident.clone(),
            mutable,
            params,
            output,
            returns: sig.output.clone()
        })
    }

    pub(crate) fn name(&self) -> String {
        self.ident.unraw().to_string()
    }
}

fn check_output(ty: &Type) -> syn::Result<()> {
    match ty {
        Type::Reference(_) => {
            Err(unsupported(ty.span(), "reference return types"))
        },
        Type::ImplTrait(_) => {
            Err(unsupported(ty.span(), "impl Trait return types"))
        },
        Type::Never(_) => {
            Err(unsupported(ty.span(), "methods that never return"))
        },
        _ if mentions_self(ty) => {
            Err(unsupported(ty.span(), "return types mentioning Self"))
        },
        _ if mentions_impl(ty) => {
            Err(unsupported(ty.span(), "impl Trait return types"))
        },
        _ if borrows(ty) => {
            Err(unsupported(ty.span(), "non-'static return types"))
        },
        _ => Ok(())
    }
}

/// One trait that the mock implements.
pub(crate) struct TraitDef {
    pub path: Path,
    pub ident: Ident,
    pub methods: Vec<MethodDef>,
}

impl TraitDef {
    fn new(path: Path, items: &[TraitItem]) -> syn::Result<Self> {
        let last = path.segments.last()
            .ok_or_else(|| syn::Error::new(path.span(), "empty trait path"))?;
        if !last.arguments.is_empty() {
            return Err(unsupported(last.arguments.span(), "generic traits"));
        }
        let ident = last.ident.clone();
        let mut methods = Vec::new();
        for item in items {
            match item {
                TraitItem::Fn(f) => methods.push(MethodDef::new(&f.attrs,
                                                                &f.sig)?),
                TraitItem::Type(t) => {
                    return Err(unsupported(t.span(), "associated types"));
                },
                TraitItem::Const(c) => {
                    return Err(unsupported(c.span(), "associated constants"));
                },
                other => {
                    return Err(unsupported(other.span(),
                        "trait items other than methods"));
                }
            }
        }
        Ok(TraitDef { path, ident, methods })
    }

    pub(crate) fn name(&self) -> String {
        self.ident.unraw().to_string()
    }

    /// Name of the static describing `method`.
    pub(crate) fn signature_ident(&self, method: &MethodDef) -> Ident {
        format_ident!("{}_{}", self.ident.unraw(), method.ident.unraw())
    }
}

/// Everything needed to generate one mock struct.
pub(crate) struct MockDef {
    pub attrs: Vec<Attribute>,
    pub vis: Visibility,
    /// The mock's base name, without the "Mock" prefix.
    pub ident: Ident,
    pub traits: Vec<TraitDef>,
}

impl MockDef {
    /// Describe the mock of a trait marked `#[automock]`.
    pub(crate) fn from_trait(item: &ItemTrait) -> syn::Result<Self> {
        if !item.generics.params.is_empty() ||
            item.generics.where_clause.is_some()
        {
            return Err(unsupported(item.generics.span(), "generic traits"));
        }
        if let Some(u) = &item.unsafety {
            return Err(unsupported(u.span(), "unsafe traits"));
        }
        for bound in item.supertraits.iter() {
            let allowed = match bound {
                TypeParamBound::Trait(t) => t.path.is_ident("Send") ||
                    t.path.is_ident("Sync"),
                TypeParamBound::Lifetime(lt) => lt.ident == "static",
                _ => false
            };
            if !allowed {
                return Err(unsupported(bound.span(),
                    "supertraits other than Send and Sync.  Use mock! to \
                     implement several traits"));
            }
        }
        let path = Path::from(item.ident.clone());
        let def = MockDef {
            attrs: Vec::new(),
            vis: item.vis.clone(),
            ident: item.ident.clone(),
            traits: vec![TraitDef::new(path, &item.items)?]
        };
        Ok(def)
    }

    fn check_duplicates(&self) -> syn::Result<()> {
        let mut seen = Vec::<String>::new();
        for t in self.traits.iter() {
            for m in t.methods.iter() {
                let name = m.name();
                if seen.contains(&name) {
                    return Err(unsupported(m.ident.span(), &format!(
                        "method {} is declared by more than one trait", name)));
                }
                seen.push(name);
            }
        }
        Ok(())
    }

    pub(crate) fn mock_ident(&self) -> Ident {
        format_ident!("Mock{}", self.ident.unraw())
    }

    pub(crate) fn calls_ident(&self) -> Ident {
        format_ident!("Mock{}Calls", self.ident.unraw())
    }

    pub(crate) fn contract_ident(&self) -> Ident {
        format_ident!("__Mock{}Contract", self.ident.unraw())
    }

    pub(crate) fn mod_ident(&self) -> Ident {
        format_ident!("__understudy_Mock{}", self.ident.unraw())
    }
}

/// Parses the body of `mock!`:
///
/// ```text
/// #[attrs] pub Name;
/// trait path::to::TraitA { fn ...; }
/// trait TraitB { fn ...; }
/// ```
impl Parse for MockDef {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let vis: Visibility = input.parse()?;
        let ident: Ident = input.parse()?;
        if input.peek(Token![<]) {
            return Err(unsupported(input.span(), "generic mocks"));
        }
        input.parse::<Token![;]>()?;
        let mut traits = Vec::new();
        while !input.is_empty() {
            input.call(Attribute::parse_outer)?;
            if input.peek(Token![unsafe]) {
                return Err(unsupported(input.span(), "unsafe traits"));
            }
            input.parse::<Token![trait]>()?;
            let path = input.call(Path::parse_mod_style)?;
            if input.peek(Token![<]) {
                return Err(unsupported(input.span(), "generic traits"));
            }
            if input.peek(Token![:]) {
                return Err(unsupported(input.span(),
                    "supertrait lists.  List each trait separately"));
            }
            let content;
            braced!(content in input);
            let mut items = Vec::new();
            while !content.is_empty() {
                items.push(content.parse::<TraitItem>()?);
            }
            traits.push(TraitDef::new(path, &items)?);
        }
        if traits.is_empty() {
            return Err(syn::Error::new(ident.span(),
                "mock! needs at least one trait"));
        }
        let def = MockDef { attrs, vis, ident, traits };
        def.check_duplicates()?;
        Ok(def)
    }
}

#[cfg(test)]
mod t {
    use super::*;
    use pretty_assertions::assert_eq;
    use syn::parse2;

    fn automock_error(code: TokenStream) -> String {
        let item: ItemTrait = parse2(code).unwrap();
        match MockDef::from_trait(&item) {
            Ok(_) => panic!("should have been rejected"),
            Err(e) => e.to_string()
        }
    }

    fn mock_error(code: TokenStream) -> String {
        match parse2::<MockDef>(code) {
            Ok(_) => panic!("should have been rejected"),
            Err(e) => e.to_string()
        }
    }

    #[test]
    fn async_method() {
        assert_eq!("unsupported mock target: async methods",
            automock_error(quote!(trait A { async fn foo(&self); })));
    }

    #[test]
    fn associated_type() {
        assert_eq!("unsupported mock target: associated types",
            automock_error(quote!(trait A { type T; fn foo(&self); })));
    }

    #[test]
    fn by_value_receiver() {
        assert_eq!("unsupported mock target: methods taking self by value",
            automock_error(quote!(trait A { fn foo(self); })));
    }

    #[test]
    fn generic_method() {
        assert_eq!("unsupported mock target: generic methods",
            automock_error(quote!(trait A { fn foo<T>(&self, t: T); })));
    }

    #[test]
    fn generic_trait() {
        assert_eq!("unsupported mock target: generic traits",
            automock_error(quote!(trait A<T> { fn foo(&self, t: T); })));
    }

    #[test]
    fn reference_return() {
        assert_eq!("unsupported mock target: reference return types",
            automock_error(quote!(trait A { fn foo(&self) -> &u32; })));
    }

    #[test]
    fn static_method() {
        assert_eq!("unsupported mock target: static methods",
            automock_error(quote!(trait A { fn foo() -> u32; })));
    }

    #[test]
    fn supertrait() {
        let e = automock_error(quote!(trait A: Clone { fn foo(&self); }));
        assert!(e.starts_with("unsupported mock target: supertraits"), "{}", e);
    }

    #[test]
    fn send_sync_supertraits() {
        let item: ItemTrait = parse2(quote!(
            pub trait A: Send + Sync + 'static { fn foo(&self); }
        )).unwrap();
        let def = MockDef::from_trait(&item).unwrap();
        assert_eq!("MockA", def.mock_ident().to_string());
    }

    #[test]
    fn reference_argument() {
        let item: ItemTrait = parse2(quote!(
            trait A { fn foo(&mut self, key: &str, n: u32); }
        )).unwrap();
        let def = MockDef::from_trait(&item).unwrap();
        let m = &def.traits[0].methods[0];
        assert!(m.mutable);
        assert_eq!(2, m.params.len());
        assert_eq!(
            quote!(<str as ::std::borrow::ToOwned>::Owned).to_string(),
            m.params[0].recorded.to_token_stream().to_string());
        assert_eq!(quote!(u32).to_string(),
            m.params[1].recorded.to_token_stream().to_string());
        assert_eq!("()", type_name(&m.output));
    }

    #[test]
    fn nested_reference_argument() {
        assert_eq!("unsupported mock target: non-'static argument types",
            automock_error(quote!(trait A {
                fn foo(&self, x: Option<&str>);
            })));
    }

    #[test]
    fn type_names() {
        let ty: Type = parse2(quote!(Option<Vec<(u8, ::std::string::String)>>))
            .unwrap();
        assert_eq!("Option<Vec<(u8, ::std::string::String)>>", type_name(&ty));
        let ty: Type = parse2(quote!(&'static [u8; 4])).unwrap();
        assert_eq!("&'static [u8; 4]", type_name(&ty));
    }

    #[test]
    fn mock_two_traits() {
        let def: MockDef = parse2(quote!(
            pub Store;
            trait Reader { fn read(&self, key: String) -> Option<String>; }
            trait crate::io::Writer { fn write(&self, key: String); }
        )).unwrap();
        assert_eq!(2, def.traits.len());
        assert_eq!("Writer", def.traits[1].name());
        assert_eq!("MockStoreCalls", def.calls_ident().to_string());
    }

    #[test]
    fn mock_duplicate_method() {
        assert_eq!(
            "unsupported mock target: method read is declared by more than \
             one trait",
            mock_error(quote!(
                Store;
                trait A { fn read(&self); }
                trait B { fn read(&self); }
            )));
    }

    #[test]
    fn mock_without_traits() {
        assert_eq!("mock! needs at least one trait",
            mock_error(quote!(Store;)));
    }
}
