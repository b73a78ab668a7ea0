use di_abstractions::{Injectable, ServiceList, TypeDescriptor};
use injection_macros::Injectable;
use std::sync::Arc;

trait Weapon: Send + Sync {}

#[derive(Injectable)]
struct Armory {
    _weapons: ServiceList<dyn Weapon>,
    _primary: Option<Arc<dyn Weapon>>,
}

#[derive(Injectable)]
struct Empty;

fn main() {
    let mut descriptor = TypeDescriptor::<Armory>::new();
    Armory::describe(&mut descriptor);
    assert_eq!(descriptor.constructors().len(), 1);
    assert_eq!(descriptor.constructors()[0].arity(), 2);

    let mut descriptor = TypeDescriptor::<Empty>::new();
    Empty::describe(&mut descriptor);
    assert_eq!(descriptor.constructors()[0].arity(), 0);
}
