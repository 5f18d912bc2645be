// vim: tw=80
//! What unstubbed calls return.

use understudy::*;

#[derive(Debug)]
struct Connection;

#[automock]
trait Factory {
    fn count(&self) -> u32;
    fn name(&self) -> String;
    fn items(&self) -> Vec<u8>;
    fn maybe(&self) -> Option<u64>;
    fn flag(&self) -> bool;
    fn pair(&self) -> (i32, String);
    fn connect(&self, host: String) -> Connection;
}

fn with_answer(ctx: &Context, answer: DefaultAnswer) -> MockFactory {
    MockFactory::with_options(ctx,
        MockOptions::new().default_answer(answer))
}

#[test]
fn zero_values() {
    let ctx = Context::new();
    let factory = MockFactory::new(&ctx);
    assert_eq!(0, factory.count());
    assert_eq!("", factory.name());
    assert!(factory.items().is_empty());
    assert_eq!(None, factory.maybe());
    assert!(!factory.flag());
    assert_eq!((0, String::new()), factory.pair());
}

#[test]
#[should_panic(expected = "factory.connect(\"db\"): no matching stubbing, and \
                           `Connection` has no default value")]
fn no_default() {
    let ctx = Context::new();
    let factory = MockFactory::new(&ctx);
    factory.connect("db".to_owned());
}

#[test]
fn stubbed_without_default() {
    let ctx = Context::new();
    let factory = MockFactory::new(&ctx);
    stub(&factory).connect(any()).then_answer(|_| Connection);
    factory.connect("db".to_owned());
    verify(&factory, once()).connect("db").unwrap();
}

#[test]
fn smart_nulls_return_zero_values() {
    let ctx = Context::new();
    let factory = with_answer(&ctx, DefaultAnswer::ReturnSmartNulls);
    assert_eq!(0, factory.count());
    assert_eq!(None, factory.maybe());
}

#[test]
#[should_panic(expected = "Unstubbed call factory.connect(\"db\") has no \
                           default return value")]
fn smart_nulls_explain_missing_values() {
    let ctx = Context::new();
    let factory = with_answer(&ctx, DefaultAnswer::ReturnSmartNulls);
    factory.connect("db".to_owned());
}

#[test]
fn custom() {
    let ctx = Context::new();
    let factory = with_answer(&ctx, DefaultAnswer::custom(|i| {
        match i.method().name {
            "count" => Some(reply(42u32)),
            "connect" => Some(reply(Connection)),
            _ => None
        }
    }));
    assert_eq!(42, factory.count());
    assert_eq!("", factory.name());
    factory.connect("db".to_owned());
}

#[test]
fn custom_of_the_wrong_type_falls_back() {
    let ctx = Context::new();
    let factory = with_answer(&ctx,
        DefaultAnswer::custom(|_| Some(reply("not a number"))));
    assert_eq!(0, factory.count());
}

#[test]
fn stubbing_beats_default_answer() {
    let ctx = Context::new();
    let factory = with_answer(&ctx,
        DefaultAnswer::custom(|_| Some(reply(42u32))));
    stub(&factory).count().then_return(7);
    assert_eq!(7, factory.count());
}
