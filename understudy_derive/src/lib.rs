// vim: tw=80
//! Proc Macros for use with Understudy
//!
//! You probably don't want to use this crate directly.  Instead, you use its
//! reexports via the [`understudy`](../understudy/index.html) crate.

extern crate proc_macro;

use proc_macro2::TokenStream;
use syn::{parse2, spanned::Spanned, Item};

mod codegen;
mod contract;

use crate::contract::{unsupported, MockDef};

fn do_automock(attrs: TokenStream, input: TokenStream) -> TokenStream {
    if !attrs.is_empty() {
        return syn::Error::new(attrs.span(), "#[automock] takes no arguments")
            .to_compile_error();
    }
    let item: Item = match parse2(input) {
        Ok(item) => item,
        Err(e) => return e.to_compile_error()
    };
    let result = match &item {
        Item::Trait(t) => MockDef::from_trait(t),
        other => Err(unsupported(other.span(),
            "#[automock] only mocks traits"))
    };
    match result {
        Ok(def) => def.gen(),
        Err(e) => e.to_compile_error()
    }
}

fn do_mock(input: TokenStream) -> TokenStream {
    match parse2::<MockDef>(input) {
        Ok(def) => def.gen(),
        Err(e) => e.to_compile_error()
    }
}

/// Manually define a mock that implements one or more traits.
///
/// The syntax is the mock's name, a semicolon, then each trait with the
/// declarations of its methods.  The traits themselves must be defined
/// elsewhere.
///
/// ```
/// # use understudy::*;
/// trait Greeter {
///     fn greet(&self, name: &str) -> String;
/// }
/// trait Farewell {
///     fn bye(&mut self);
/// }
/// mock! {
///     pub Host;
///     trait Greeter {
///         fn greet(&self, name: &str) -> String;
///     }
///     trait Farewell {
///         fn bye(&mut self);
///     }
/// }
/// let ctx = Context::new();
/// let mut host = MockHost::new(&ctx);
/// stub(&host).greet("ann").then_return("hello ann".to_owned());
/// assert_eq!("hello ann", host.greet("ann"));
/// host.bye();
/// verify(&host, once()).bye().unwrap();
/// ```
///
/// Trait paths may be qualified, like `trait io::Write`.
#[proc_macro]
pub fn mock(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    do_mock(item.into()).into()
}

/// Automatically generate a mock type for a trait.
///
/// The mock struct's name is the trait's, prepended with "Mock".  It has a
/// `new` constructor taking a [`Context`](../understudy/struct.Context.html),
/// `with_options` and `spy` constructors, and an implementation of the trait
/// that records every call.
///
/// ```
/// # use understudy::*;
/// #[automock]
/// pub trait Clock {
///     fn now(&self) -> u64;
/// }
///
/// let ctx = Context::new();
/// let clock = MockClock::new(&ctx);
/// stub(&clock).now().then_return(1234);
/// assert_eq!(1234, clock.now());
/// ```
///
/// Traits that are generic, unsafe, have associated items, or have generic or
/// `async` methods are rejected at compile time.
#[proc_macro_attribute]
pub fn automock(attrs: proc_macro::TokenStream, input: proc_macro::TokenStream)
    -> proc_macro::TokenStream
{
    let input: proc_macro2::TokenStream = input.into();
    let mut output = input.clone();
    output.extend(do_automock(attrs.into(), input));
    output.into()
}

#[cfg(test)]
mod t {
    use super::*;
    use quote::quote;

    fn is_error(output: &TokenStream, msg: &str) -> bool {
        let s = output.to_string();
        s.contains("compile_error") && s.contains(msg)
    }

    #[test]
    fn automock_with_arguments() {
        let output = do_automock(quote!(nonsense),
                                 quote!(trait Foo { fn foo(&self); }));
        assert!(is_error(&output, "takes no arguments"));
    }

    #[test]
    fn automock_struct() {
        let output = do_automock(TokenStream::new(), quote!(struct Foo;));
        assert!(is_error(&output, "only mocks traits"));
    }

    #[test]
    fn automock_trait() {
        let output = do_automock(TokenStream::new(),
                                 quote!(trait Foo { fn foo(&self) -> u32; }));
        let s = output.to_string();
        assert!(!s.contains("compile_error"));
        assert!(s.contains("struct MockFoo"));
        assert!(s.contains("struct MockFooCalls"));
    }

    #[test]
    fn mock_without_traits() {
        let output = do_mock(quote!(Foo;));
        assert!(is_error(&output, "at least one trait"));
    }

    #[test]
    fn mock_two_traits() {
        let output = do_mock(quote!(
            Foo;
            trait A { fn a(&self); }
            trait B { fn b(&self) -> i32; }
        ));
        let s = output.to_string();
        assert!(!s.contains("compile_error"));
        assert!(s.contains("impl A for MockFoo"));
        assert!(s.contains("impl B for MockFoo"));
    }
}
