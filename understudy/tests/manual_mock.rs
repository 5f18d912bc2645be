// vim: tw=80
//! The untyped API beneath the generated mocks: method descriptors, patterns
//! built by name, and hand-written mocks.

use understudy::*;

#[automock]
trait Dao {
    fn update(&self, id: u32, name: String) -> bool;
    fn delete(&self, id: u32);
}

#[test]
fn patterns_by_name() {
    let ctx = Context::new();
    let dao = MockDao::new(&ctx);
    let handle = dao.handle();

    let update = handle.pattern("update",
        vec![Matcher::equals(1u32), Matcher::any()]).unwrap();
    handle.stub::<bool>(update.clone()).then_return(true);
    assert!(dao.update(1, "ann".to_owned()));
    assert!(!dao.update(2, "bob".to_owned()));
    handle.verify(&update, &once()).unwrap();

    let delete = handle.pattern("Dao::delete",
        vec![Matcher::type_is::<u32>()]).unwrap();
    dao.delete(3);
    handle.verify(&delete, &times(1)).unwrap();
    assert_eq!("delete(is_a::<u32>())", delete.to_string());
}

#[test]
fn unknown_method() {
    let ctx = Context::new();
    let dao = MockDao::new(&ctx);
    let e = dao.handle().pattern("insert", Vec::new()).unwrap_err();
    assert_eq!("Unsupported mock target: dao has no method insert",
               e.to_string());
}

#[test]
fn wrong_arity() {
    let ctx = Context::new();
    let dao = MockDao::new(&ctx);
    let e = dao.handle().pattern("update", vec![Matcher::any()]).unwrap_err();
    assert_eq!("Misconfigured stubbing: Dao::update(u32, String) -> bool \
                takes 2 argument(s), but 1 matcher(s) were given",
               e.to_string());
}

#[test]
fn invocations() {
    let ctx = Context::new();
    let dao = MockDao::new(&ctx);
    dao.update(7, "ann".to_owned());

    let log = dao.handle().invocations();
    let call = &log[0];
    assert_eq!(dao.handle().id(), call.mock());
    assert_eq!("dao", call.mock_name());
    assert_eq!("update", call.method().name);
    assert_eq!(["u32", "String"], call.method().params);
    assert_eq!(2, call.args().len());
    assert_eq!(Some(&7u32), call.arg::<u32>(0));
    assert_eq!(Some("ann"), call.arg::<String>(1).map(String::as_str));
    assert_eq!(None, call.arg::<u64>(0));
    assert_eq!(None, call.arg::<u32>(2));
    assert_eq!(1, call.sequence());
    assert!(!call.is_verified());
    assert_eq!(r#"dao.update(7, "ann")"#, call.to_string());
    assert_eq!(r#"#1 dao.update(7, "ann")"#, format!("{:?}", call));

    let pattern = dao.handle().pattern("update",
        vec![Matcher::any(), Matcher::equals("ann".to_owned())]).unwrap();
    assert!(pattern.matches(call));
    assert_eq!(2, pattern.matchers().len());
    assert!(MockDao::method_set().contains(pattern.method()));
}

trait Greeter: Send {
    fn greet(&self, name: String) -> String;
}

static GREET: MethodSignature = MethodSignature {
    contract: "Greeter",
    name: "greet",
    params: &["String"],
    returns: "String",
};

static GREETER: MethodSet = MethodSet {
    name: "HandGreeter",
    traits: &["Greeter"],
    methods: &[&GREET],
};

/// A mock written without the macros.
struct HandGreeter(Mock<dyn Greeter>);

impl Double for HandGreeter {
    fn handle(&self) -> &MockHandle {
        self.0.handle()
    }
}

impl Greeter for HandGreeter {
    fn greet(&self, name: String) -> String {
        self.0.dispatch(&GREET, vec![arg(name.clone())], Some(String::new()),
                        move |real| real.greet(name))
    }
}

struct Polite;

impl Greeter for Polite {
    fn greet(&self, name: String) -> String {
        format!("Good day, {}", name)
    }
}

#[test]
fn hand_written_mock() {
    let ctx = Context::new();
    let greeter = HandGreeter(Mock::new(&ctx, &GREETER,
                                        MockOptions::default()));
    let handle = greeter.handle();
    let pattern = handle.pattern("greet", vec![Matcher::any()]).unwrap();
    handle.stub::<String>(pattern.clone()).then_return("hi".to_owned());

    assert_eq!("hi", greeter.greet("ann".to_owned()));
    handle.verify(&pattern, &once()).unwrap();
    assert_eq!("handGreeter", handle.name());
    verify_no_more_interactions(&[&greeter]).unwrap();
}

#[test]
fn hand_written_spy() {
    let ctx = Context::new();
    let greeter = HandGreeter(Mock::spy(&ctx, &GREETER, Box::new(Polite),
                                        MockOptions::default()));
    assert_eq!("Good day, ann", greeter.greet("ann".to_owned()));
    assert!(greeter.handle().is_spy());
}
