use reelspin_rendering_macroquad::SpinButtonLatch;

fn run_sequence(sequence: &[bool]) -> Vec<bool> {
    let mut latch = SpinButtonLatch::default();
    let mut spins = Vec::new();
    for &pressed in sequence {
        spins.push(latch.take_spin());
        if pressed {
            latch.register_spin();
        }
    }

    // Flush any trailing latched click so the harness observes the final spin.
    spins.push(latch.take_spin());
    spins
}

#[test]
fn spin_button_sequence_is_deterministic() {
    let button_sequence = [false, true, false, true, true, false];
    let expected = vec![false, false, true, false, true, true, false];

    let first_run = run_sequence(&button_sequence);
    let second_run = run_sequence(&button_sequence);

    assert_eq!(first_run, expected);
    assert_eq!(first_run, second_run);
}

#[test]
fn repeated_clicks_within_a_frame_collapse_into_one_spin() {
    let mut latch = SpinButtonLatch::default();
    latch.register_spin();
    latch.register_spin();

    assert!(latch.take_spin());
    assert!(!latch.take_spin());
}
