// vim: tw=80
//! A service that renames people, checked against a mocked data access
//! object.
use understudy::*;

#[derive(Clone, Debug, PartialEq)]
pub struct Person {
    pub id: u32,
    pub name: String,
}

#[automock]
pub trait PersonDao {
    fn get_person(&self, id: u32) -> Option<Person>;
    fn update(&self, person: Person) -> bool;
}

pub struct PersonService<'a> {
    dao: &'a dyn PersonDao,
}

impl<'a> PersonService<'a> {
    pub fn new(dao: &'a dyn PersonDao) -> Self {
        PersonService { dao }
    }

    /// Rename a person.  Returns false if there is no such person.
    pub fn update(&self, id: u32, name: &str) -> bool {
        match self.dao.get_person(id) {
            Some(person) => self.dao.update(Person {
                name: name.to_owned(),
                ..person
            }),
            None => false
        }
    }
}

fn main() {
    let ctx = Context::new();
    let dao = MockPersonDao::new(&ctx);
    stub(&dao).get_person(1).then_return(Some(Person {
        id: 1,
        name: "Person1".to_owned()
    }));
    stub(&dao).update(is_a::<Person>()).then_return(true);

    let service = PersonService::new(&dao);
    println!("update(1) -> {}", service.update(1, "new name"));
    println!("update(2) -> {}", service.update(2, "new name"));

    let updated = Captor::new();
    match verify(&dao, once()).update(updated.capture()) {
        Ok(()) => println!("stored {:?}", updated.value()),
        Err(e) => println!("{}", e)
    }
    // Fails, and explains why: the second lookup was for person 2
    if let Err(e) = verify(&dao, times(2)).get_person(1) {
        println!("{}", e);
    }
}
