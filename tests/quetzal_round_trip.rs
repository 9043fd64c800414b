mod common;

use common::{interpreter_with_story, two_object_story};
use zengine::memory::Memory;
use zengine::quetzal;

#[test]
fn save_then_restore_reproduces_memory_pc_and_call_stack() {
    let story = two_object_story();
    let (mut interp, _output) = interpreter_with_story(story.clone());
    interp.run().unwrap();

    let path = std::env::temp_dir().join("zengine-quetzal-round-trip-test.qzl");
    let path = path.to_str().unwrap();

    quetzal::save(path, interp.memory(), interp.header(), interp.call_stack(), interp.pc()).unwrap();

    let mut restored_memory = Memory::new(story, interp.header().static_mem_base());
    let state = quetzal::restore(path, &mut restored_memory).unwrap();

    assert_eq!(restored_memory.as_bytes(), interp.memory().as_bytes());
    assert_eq!(state.pc, interp.pc());
    assert_eq!(state.call_stack.depth(), interp.call_stack().depth());

    std::fs::remove_file(path).ok();
}
