// vim: tw=80
//! Code generation for a validated [`MockDef`].
use proc_macro2::TokenStream;
use quote::quote;
use syn::{LitStr, Path};

use crate::contract::{type_name, MethodDef, MockDef, TraitDef};

impl MockDef {
    /// Generate the mock struct, its trait implementations, and its call
    /// selector.
    pub(crate) fn gen(&self) -> TokenStream {
        let vis = &self.vis;
        let attrs = &self.attrs;
        let mock = self.mock_ident();
        let calls = self.calls_ident();
        let contract = self.contract_ident();
        let modname = self.mod_ident();
        let paths = self.traits.iter().map(|t| &t.path).collect::<Vec<_>>();
        let statics = self.gen_statics();
        let trait_impls = self.traits.iter().map(|t| self.gen_trait_impl(t));
        let selectors = self.gen_selectors();
        let trait_names = self.traits.iter()
            .map(|t| format!("`{}`", t.name()))
            .collect::<Vec<_>>()
            .join(", ");
        let mock_doc = format!("Mock implementing {}.", trait_names);
        let calls_doc = format!("Call selector for [`{}`].", mock);
        let mock_name = LitStr::new(&mock.to_string(), mock.span());
        quote! {
            #[doc(hidden)]
            #[allow(non_camel_case_types)]
            #vis trait #contract: #(#paths +)* ::std::marker::Send {}
            impl<__T> #contract for __T
                where __T: #(#paths +)* ::std::marker::Send + ?Sized
            {}

            #[allow(non_snake_case, non_upper_case_globals)]
            mod #modname {
                #statics
            }

            #(#attrs)*
            #[doc = #mock_doc]
            #vis struct #mock {
                __understudy: ::understudy::Mock<dyn #contract>,
            }

            impl #mock {
                /// Create a mock that answers unstubbed calls with default
                /// values.
                pub fn new(ctx: &::understudy::Context) -> Self {
                    ::understudy::create_mock(ctx,
                        ::std::default::Default::default())
                }

                /// Create a mock with non-default options.
                pub fn with_options(
                    ctx: &::understudy::Context,
                    options: ::understudy::MockOptions) -> Self
                {
                    ::understudy::create_mock(ctx, options)
                }

                /// Create a spy that forwards unstubbed calls to `real`.
                pub fn spy<__T>(ctx: &::understudy::Context, real: __T) -> Self
                    where __T: #(#paths +)* ::std::marker::Send + 'static
                {
                    ::understudy::create_spy::<Self>(ctx,
                        ::std::boxed::Box::new(real))
                }
            }

            impl ::understudy::Double for #mock {
                fn handle(&self) -> &::understudy::MockHandle {
                    self.__understudy.handle()
                }
            }

            impl ::understudy::Mocked for #mock {
                type Contract = dyn #contract;
                type Calls<S: ::understudy::Sink> = #calls<S>;

                fn method_set() -> &'static ::understudy::MethodSet {
                    &#modname::METHODS
                }

                fn from_mock(mock: ::understudy::Mock<Self::Contract>) -> Self
                {
                    #mock { __understudy: mock }
                }

                fn calls<S: ::understudy::Sink>(sink: S) -> Self::Calls<S> {
                    #calls { sink }
                }
            }

            impl ::std::fmt::Debug for #mock {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>)
                    -> ::std::fmt::Result
                {
                    f.debug_struct(#mock_name)
                        .field("name",
                               &::understudy::Double::handle(self).name())
                        .finish()
                }
            }

            #(#trait_impls)*

            #[doc = #calls_doc]
            #vis struct #calls<S> {
                sink: S,
            }

            impl<S: ::understudy::Sink> #calls<S> {
                #selectors
            }
        }
    }

    /// One `MethodSignature` static per method, and the mock's `MethodSet`.
    pub(crate) fn gen_statics(&self) -> TokenStream {
        let base = LitStr::new(&self.ident.to_string(), self.ident.span());
        let mut signatures = Vec::new();
        let mut sids = Vec::new();
        for t in self.traits.iter() {
            let contract = LitStr::new(&t.name(), t.ident.span());
            for m in t.methods.iter() {
                let sid = t.signature_ident(m);
                let attrs = &m.attrs;
                let name = LitStr::new(&m.name(), m.ident.span());
                let params = m.params.iter()
                    .map(|p| LitStr::new(&type_name(&p.ty), p.ident.span()));
                let returns = LitStr::new(&type_name(&m.output),
                                          m.ident.span());
                signatures.push(quote! {
                    #(#attrs)*
                    pub static #sid: ::understudy::MethodSignature =
                        ::understudy::MethodSignature {
                            contract: #contract,
                            name: #name,
                            params: &[#(#params),*],
                            returns: #returns,
                        };
                });
                sids.push(quote!(#(#attrs)* &#sid));
            }
        }
        let trait_names = self.traits.iter()
            .map(|t| LitStr::new(&t.name(), t.ident.span()));
        quote! {
            #(#signatures)*
            pub static METHODS: ::understudy::MethodSet =
                ::understudy::MethodSet {
                    name: #base,
                    traits: &[#(#trait_names),*],
                    methods: &[#(#sids),*],
                };
        }
    }

    fn gen_trait_impl(&self, t: &TraitDef) -> TokenStream {
        let mock = self.mock_ident();
        let path = &t.path;
        let methods = t.methods.iter().map(|m| self.gen_method(t, path, m));
        quote! {
            impl #path for #mock {
                #(#methods)*
            }
        }
    }

    /// The trait method, which dispatches through the mock.
    fn gen_method(&self, t: &TraitDef, path: &Path, m: &MethodDef)
        -> TokenStream
    {
        let modname = self.mod_ident();
        let sid = t.signature_ident(m);
        let attrs = &m.attrs;
        let unsafety = &m.unsafety;
        let ident = &m.ident;
        let returns = &m.returns;
        let output = &m.output;
        let pidents = m.params.iter().map(|p| &p.ident).collect::<Vec<_>>();
        let ptys = m.params.iter().map(|p| &p.ty);
        let records = m.params.iter().map(|p| &p.record);
        let (receiver, real) = if m.mutable {
            (quote!(&mut self), quote!(&mut *__understudy_real))
        } else {
            (quote!(&self), quote!(&*__understudy_real))
        };
        let call = quote!(#path::#ident(#real, #(#pidents),*));
        let call = if unsafety.is_some() {
            quote!(unsafe { #call })
        } else {
            call
        };
        quote! {
            #(#attrs)*
            #unsafety fn #ident(#receiver, #(#pidents: #ptys),*) #returns {
                let __understudy_args = ::std::vec![
                    #(::understudy::arg(#records)),*
                ];
                let __understudy_zero = {
                    use ::understudy::{
                        ReturnDefault as _, ReturnNoDefault as _
                    };
                    (&::understudy::DefaultReturner::<#output>::new())
                        .return_default()
                };
                self.__understudy.dispatch(
                    &#modname::#sid,
                    __understudy_args,
                    __understudy_zero,
                    move |__understudy_real| #call)
            }
        }
    }

    /// The call selector's methods, one per mocked method.
    fn gen_selectors(&self) -> TokenStream {
        let modname = self.mod_ident();
        let mut selectors = Vec::new();
        for t in self.traits.iter() {
            for m in t.methods.iter() {
                let sid = t.signature_ident(m);
                let attrs = &m.attrs;
                let ident = &m.ident;
                let output = &m.output;
                let doc = format!("Select calls of `{}::{}`.", t.name(),
                                  m.name());
                let pidents = m.params.iter().map(|p| &p.ident)
                    .collect::<Vec<_>>();
                let recorded = m.params.iter().map(|p| &p.recorded)
                    .collect::<Vec<_>>();
                selectors.push(quote! {
                    #(#attrs)*
                    #[doc = #doc]
                    #[must_use = "answer or verify the selected call"]
                    pub fn #ident(self, #(
                        #pidents: impl ::std::convert::Into<
                            ::understudy::ArgMatcher<#recorded>>
                    ),*) -> <S as ::understudy::Sink>::Output<#output>
                    {
                        ::understudy::Sink::accept::<#output>(self.sink,
                            ::understudy::CallPattern::new(
                                &#modname::#sid,
                                ::std::vec![#(
                                    ::understudy::ArgMatcher::<#recorded>
                                        ::into_matcher(
                                            ::std::convert::Into::into(
                                                #pidents))
                                ),*]))
                    }
                });
            }
        }
        quote!(#(#selectors)*)
    }
}

#[cfg(test)]
mod t {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;
    use syn::{parse2, ItemTrait};

    fn check(desired: &str, actual: TokenStream) {
        // Let proc_macro2 reformat the whitespace in the expected string
        let expected = TokenStream::from_str(desired).unwrap().to_string();
        assert_eq!(expected, actual.to_string());
    }

    fn automock_def(code: TokenStream) -> MockDef {
        let item: ItemTrait = parse2(code).unwrap();
        MockDef::from_trait(&item).unwrap()
    }

    #[test]
    fn statics() {
        let def = automock_def(quote!(
            pub trait List {
                fn add(&self, item: String) -> bool;
                fn get(&self, index: usize, default: &str) -> Option<String>;
                fn clear(&mut self);
            }
        ));
        let desired = r#"
            pub static List_add: ::understudy::MethodSignature =
                ::understudy::MethodSignature {
                    contract: "List",
                    name: "add",
                    params: &["String"],
                    returns: "bool",
                };
            pub static List_get: ::understudy::MethodSignature =
                ::understudy::MethodSignature {
                    contract: "List",
                    name: "get",
                    params: &["usize", "&str"],
                    returns: "Option<String>",
                };
            pub static List_clear: ::understudy::MethodSignature =
                ::understudy::MethodSignature {
                    contract: "List",
                    name: "clear",
                    params: &[],
                    returns: "()",
                };
            pub static METHODS: ::understudy::MethodSet =
                ::understudy::MethodSet {
                    name: "List",
                    traits: &["List"],
                    methods: &[&List_add, &List_get, &List_clear],
                };
        "#;
        check(desired, def.gen_statics());
    }

    #[test]
    fn method() {
        let def = automock_def(quote!(
            trait Dao {
                fn update(&mut self, id: u32, name: &str) -> bool;
            }
        ));
        let t = &def.traits[0];
        let desired = r#"
            fn update(&mut self, id: u32, name: &str) -> bool {
                let __understudy_args = ::std::vec![
                    ::understudy::arg(::std::clone::Clone::clone(&id)),
                    ::understudy::arg(::std::borrow::ToOwned::to_owned(& *name))
                ];
                let __understudy_zero = {
                    use ::understudy::{
                        ReturnDefault as _, ReturnNoDefault as _
                    };
                    (& ::understudy::DefaultReturner:: <bool> ::new())
                        .return_default()
                };
                self.__understudy.dispatch(
                    &__understudy_MockDao::Dao_update,
                    __understudy_args,
                    __understudy_zero,
                    move |__understudy_real|
                        Dao::update(&mut *__understudy_real, id, name))
            }
        "#;
        check(desired, def.gen_method(t, &t.path, &t.methods[0]));
    }

    #[test]
    fn selector() {
        let def = automock_def(quote!(
            trait Log {
                fn write(&self, line: &str);
            }
        ));
        let desired = r#"
            #[doc = "Select calls of `Log::write`."]
            #[must_use = "answer or verify the selected call"]
            pub fn write(self, line: impl ::std::convert::Into<
                ::understudy::ArgMatcher<
                    <str as ::std::borrow::ToOwned> ::Owned>>
            ) -> <S as ::understudy::Sink> ::Output<()>
            {
                ::understudy::Sink::accept:: <()>(self.sink,
                    ::understudy::CallPattern::new(
                        &__understudy_MockLog::Log_write,
                        ::std::vec![
                            ::understudy::ArgMatcher:: <
                                <str as ::std::borrow::ToOwned> ::Owned>
                                ::into_matcher(::std::convert::Into::into(line))
                        ]))
            }
        "#;
        check(desired, def.gen_selectors());
    }
}
