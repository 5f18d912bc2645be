// vim: tw=80
//! A service tested through a mocked data access object.

use understudy::*;

#[derive(Clone, Debug, PartialEq)]
struct Person {
    id: u32,
    name: String,
}

#[automock]
trait PersonDao {
    fn get_person(&self, id: u32) -> Option<Person>;
    fn update(&self, person: Person) -> bool;
}

struct PersonService<'a> {
    dao: &'a dyn PersonDao,
}

impl<'a> PersonService<'a> {
    fn update(&self, id: u32, name: &str) -> bool {
        match self.dao.get_person(id) {
            Some(person) => self.dao.update(Person {
                name: name.to_owned(),
                ..person
            }),
            None => false
        }
    }
}

fn mock_dao(ctx: &Context) -> MockPersonDao {
    let dao = MockPersonDao::new(ctx);
    stub(&dao).get_person(1).then_return(Some(Person {
        id: 1,
        name: "Person1".to_owned()
    }));
    stub(&dao).update(is_a::<Person>()).then_return(true);
    dao
}

#[test]
fn update() {
    let ctx = Context::new();
    let dao = mock_dao(&ctx);
    let service = PersonService { dao: &dao };

    assert!(service.update(1, "new name"));

    verify(&dao, times(1)).get_person(eq(1)).unwrap();
    verify(&dao, times(1)).update(is_a::<Person>()).unwrap();
    verify_no_more_interactions(&[&dao]).unwrap();
}

#[test]
fn update_stores_the_new_name() {
    let ctx = Context::new();
    let dao = mock_dao(&ctx);
    let service = PersonService { dao: &dao };

    service.update(1, "new name");

    let stored = Captor::new();
    verify(&dao, once()).update(stored.capture()).unwrap();
    assert_eq!(Some(Person { id: 1, name: "new name".to_owned() }),
               stored.value());
}

#[test]
fn update_not_found() {
    let ctx = Context::new();
    let dao = mock_dao(&ctx);
    let service = PersonService { dao: &dao };

    assert!(!service.update(2, "new name"));

    verify(&dao, times(1)).get_person(eq(2)).unwrap();
    verify(&dao, never()).update(is_a::<Person>()).unwrap();
}

#[test]
fn update_not_found_explains_lookup() {
    let ctx = Context::new();
    let dao = mock_dao(&ctx);
    let service = PersonService { dao: &dao };

    service.update(2, "new name");

    let e = verify(&dao, times(1)).get_person(eq(1)).unwrap_err();
    assert_eq!("Wanted personDao.get_person(1) times(1), but it was invoked \
                0 time(s)\n\
                Other invocations of personDao.get_person(1):\n    \
                #1 personDao.get_person(2)\n        \
                argument 0: expected 1, was 2",
               e.to_string());
}
