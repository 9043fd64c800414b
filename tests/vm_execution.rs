mod common;

use common::{interpreter_with_story, two_object_story};

#[test]
fn runs_object_arithmetic_and_text_to_completion() {
    let (mut interp, output) = interpreter_with_story(two_object_story());

    interp.run().unwrap();

    assert!(interp.is_finished());
    assert_eq!(interp.read_variable(16).unwrap(), 2, "get_parent should see insert_obj's new parent");
    assert_eq!(interp.read_variable(17).unwrap(), 5, "add 2 3 should store 5");
    assert_eq!(*output.borrow(), "hi\n");
}

#[test]
fn insert_obj_links_survive_through_the_object_table() {
    let (mut interp, _output) = interpreter_with_story(two_object_story());
    interp.run().unwrap();

    assert_eq!(interp.objects().parent(interp.memory(), 1), 2);
    assert_eq!(interp.objects().child(interp.memory(), 2), 1);
}
