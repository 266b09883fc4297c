//! Behavioural tests driving the interpreter through its public interface.
use chip8_vm::prelude::*;

fn load_vm(bytecode: &[u8]) -> Chip8Vm {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_bytecode(bytecode).unwrap();
    vm
}

#[test]
fn test_program_too_large() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());

    let err = vm.load_bytecode(&[0u8; 0xE01]).unwrap_err();
    assert!(matches!(err, Chip8Error::LargeProgram { .. }));
}

#[test]
fn test_program_fits_exactly() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());

    assert!(vm.load_bytecode(&[0u8; 0xE00]).is_ok());
    assert_eq!(vm.program_counter(), 0x200);
}

#[test]
fn test_reload_clears_previous_program() {
    let mut vm = load_vm(&[0x12, 0x00, 0x63, 0x55]);

    // The second program is shorter. None of the first may linger.
    vm.load_bytecode(&[0x12, 0x00]).unwrap();

    let ram = vm.dump_ram(4).unwrap();
    let lines: Vec<&str> = ram.lines().collect();
    assert_eq!(lines, vec!["0200: 1200", "0202: 0000"]);
}

#[test]
fn test_draw_and_clear_through_display_dump() {
    let mut vm = load_vm(&[
        0xA2, 0x08, // LD I, 0x208
        0xD0, 0x01, // DRW v0, v0, 1
        0x00, 0xE0, // CLS
        0x00, 0x00, //
        0xF0, 0x00, // sprite
    ]);

    assert_eq!(vm.run_steps(2).unwrap(), Flow::Draw);
    assert!(vm.take_redraw());

    let display = vm.dump_display().unwrap();
    assert!(display.lines().next().unwrap().starts_with("####...."));
    assert_eq!(display.matches('#').count(), 4);

    assert_eq!(vm.step().unwrap(), Flow::Draw);
    assert!(vm.take_redraw());

    let display = vm.dump_display().unwrap();
    assert_eq!(display.matches('#').count(), 0);
}

#[test]
fn test_key_wait_resumes_on_keypress() {
    let mut vm = load_vm(&[
        0xF0, 0x0A, // LD v0, K
        0x30, 0x07, // SE v0, 7
        0x12, 0x02, // JP 0x202  ; not taken when key 7 was stored
    ]);

    // Stalls on the same address until a key arrives.
    assert_eq!(vm.step().unwrap(), Flow::KeyWait);
    assert_eq!(vm.step().unwrap(), Flow::KeyWait);
    assert_eq!(vm.program_counter(), 0x200);

    vm.set_key(KeyCode::Key7, true);
    assert_eq!(vm.step().unwrap(), Flow::Ok);
    assert_eq!(vm.program_counter(), 0x202);

    // The skip proves the key value landed in the register.
    vm.step().unwrap();
    assert_eq!(vm.program_counter(), 0x206);
}

#[test]
fn test_timers_count_down_to_zero() {
    let mut vm = load_vm(&[
        0x60, 0x03, // LD v0, 3
        0xF0, 0x18, // LD ST, v0
    ]);

    vm.step().unwrap();
    assert_eq!(vm.step().unwrap(), Flow::Sound);
    assert!(vm.sound_active());

    for _ in 0..3 {
        vm.tick_timers();
    }
    assert!(!vm.sound_active());

    // Expired timers stay at zero.
    vm.tick_timers();
    assert!(!vm.sound_active());
}

#[test]
fn test_nested_calls_return_in_reverse() {
    let mut vm = load_vm(&[
        0x22, 0x06, // 0x200: CALL 0x206
        0x12, 0x02, // 0x202: JP 0x202
        0x00, 0x00, // 0x204:
        0x22, 0x0A, // 0x206: CALL 0x20A
        0x00, 0xEE, // 0x208: RET
        0x00, 0xEE, // 0x20A: RET
    ]);

    let expected = [0x206, 0x20A, 0x208, 0x202];
    for addr in expected {
        assert_eq!(vm.step().unwrap(), Flow::Jump);
        assert_eq!(vm.program_counter(), addr);
    }
}

#[test]
fn test_return_without_call_is_an_error() {
    let mut vm = load_vm(&[0x00, 0xEE]);

    assert!(matches!(
        vm.step(),
        Err(Chip8Error::StackUnderflow { .. })
    ));
}

#[test]
fn test_unknown_opcode_is_not_fatal() {
    let mut vm = load_vm(&[0xFF, 0xFF, 0x12, 0x02]);

    assert_eq!(vm.step().unwrap(), Flow::Unknown { word: 0xFFFF });
    assert_eq!(vm.program_counter(), 0x202);

    assert_eq!(vm.step().unwrap(), Flow::Jump);
}

#[test]
fn test_run_steps() {
    // Counter loop that never exits.
    let mut vm = load_vm(&[
        0x70, 0x01, // ADD v0, 1
        0x12, 0x00, // JP 0x200
    ]);

    assert_eq!(vm.run_steps(100).unwrap(), Flow::Jump);
}
