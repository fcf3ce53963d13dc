//! Background runner lifecycle: completion pulses, failures, pause/stop and
//! routine locking.

use std::time::Duration;

use aigmos::test_support::TestConsole;

const WAIT: Duration = Duration::from_secs(10);

fn settled(prefix: &'static str) -> impl Fn(&str) -> bool {
    move |status: &str| status.starts_with(prefix) && status.ends_with("trg=0")
}

#[test]
fn routine_runs_to_done_with_counter_substitution() {
    let tc = TestConsole::new().expect("console");
    tc.run("mk &build");
    tc.run("add.item &build mk $out");
    tc.run("add.item &build add.item $out:n <counter>");

    assert_eq!(tc.run("run %build"), "OK");
    let status = tc
        .wait_for("status %build", WAIT, settled("done"))
        .expect("done");
    assert_eq!(status, "done step=1 err= trg=0");
    assert_eq!(tc.run("cat $out:n"), "2");

    let job = tc.runners().get("build").expect("job");
    let log = job.log();
    assert_eq!(log.first().map(String::as_str), Some("START %build"));
    assert_eq!(log.last().map(String::as_str), Some("DONE"));
}

#[test]
fn done_pulse_is_visible_then_cleared() {
    let tc = TestConsole::new().expect("console");
    tc.run("mk &quick");
    tc.run("add.item &quick mk $x");
    tc.run("run %quick");
    tc.wait_for("status %quick", WAIT, |s| s.ends_with("trg=1"))
        .expect("pulse");
    tc.wait_for("status %quick", WAIT, settled("done"))
        .expect("cleared");
}

#[test]
fn handler_error_fails_the_runner() {
    let tc = TestConsole::new().expect("console");
    tc.run("mk &bad");
    tc.run("add.item &bad mk $ok");
    tc.run("add.item &bad cat $nope:x");
    tc.run("add.item &bad mk $never");

    tc.run("run %bad");
    let status = tc
        .wait_for("status %bad", WAIT, settled("failed"))
        .expect("failed");
    assert_eq!(
        status,
        "failed step=1 err=Error: Sub not found: kv/texts/nope trg=0"
    );
    assert_eq!(tc.run("ls $"), "ok");
}

#[test]
fn rejected_lines_and_runner_control_fail_the_runner() {
    let tc = TestConsole::new().expect("console");
    tc.run("mk &rej");
    tc.run("add.item &rej bogus");
    tc.run("run %rej");
    let status = tc
        .wait_for("status %rej", WAIT, settled("failed"))
        .expect("failed");
    assert!(status.contains("err=Unknown command"), "{status}");

    tc.run("mk &ctl");
    tc.run("add.item &ctl stop %rej");
    tc.run("run %ctl");
    let status = tc
        .wait_for("status %ctl", WAIT, settled("failed"))
        .expect("failed");
    assert!(
        status.contains("err=Runner cannot execute runner-control commands"),
        "{status}"
    );
}

#[test]
fn literal_and_stored_targets() {
    let tc = TestConsole::new().expect("console");
    tc.run("run %lit mk $from_literal");
    tc.wait_for("status %lit", WAIT, settled("done"))
        .expect("literal");
    assert_eq!(tc.run("ls $"), "from_literal");

    tc.run("add.item #cmds:one mk $from_table");
    tc.run("run %tbl #cmds:one");
    tc.wait_for("status %tbl", WAIT, settled("done"))
        .expect("table");
    assert_eq!(tc.run("ls $"), "from_literal\nfrom_table");

    assert_eq!(
        tc.run("run %x #cmds"),
        "Error: run # expects leaf (scalar), not dict node"
    );
}

#[test]
fn active_runner_locks_its_routine_until_stopped() {
    let tc = TestConsole::new().expect("console");
    tc.run("mk &long");
    tc.console()
        .store()
        .routine_mut("long")
        .expect("routine")
        .extend(std::iter::repeat_n("ls $".to_string(), 200_000));

    assert_eq!(tc.run("run %long"), "OK");
    assert_eq!(tc.run("pause %long"), "OK");
    assert_eq!(tc.run("run %long"), "Error: Runner already active");
    assert_eq!(
        tc.run("add.item &long more"),
        "Error: Routine &long is locked by %long (paused)"
    );
    assert_eq!(
        tc.run("rm &long"),
        "Error: Routine &long is locked by %long (paused)"
    );
    assert_eq!(
        tc.run("mv &long &other"),
        "Error: Routine &long is locked by %long (paused)"
    );
    assert!(tc.run("status %long").starts_with("paused"));

    assert_eq!(tc.run("stop %long"), "OK");
    tc.wait_for("status %long", WAIT, |s| s.starts_with("stopped"))
        .expect("stopped");
    tc.wait_for("add.item &long tail", WAIT, |s| s == "OK")
        .expect("unlocked");
    assert_eq!(
        tc.run("pause %long"),
        "Error: pause only valid for running/paused"
    );
}

#[test]
fn routine_unlocks_when_runner_settles() {
    let tc = TestConsole::new().expect("console");
    tc.run("mk &r");
    tc.run("add.item &r mk $x");
    tc.run("run %r");
    tc.wait_for("status %r", WAIT, |s| {
        s.starts_with("done") && s.ends_with("trg=1")
    })
    .expect("done pulse");

    assert_eq!(tc.run("add.item &r ls $"), "OK");
    assert_eq!(tc.run("run %other &r"), "OK");
    tc.wait_for("status %other", WAIT, settled("done"))
        .expect("other done");
}

#[test]
fn new_runner_takes_over_a_routine_lock() {
    let tc = TestConsole::new().expect("console");
    tc.run("mk &long");
    tc.console()
        .store()
        .routine_mut("long")
        .expect("routine")
        .extend(std::iter::repeat_n("ls $".to_string(), 200_000));

    assert_eq!(tc.run("run %a &long"), "OK");
    assert_eq!(tc.run("pause %a"), "OK");
    assert_eq!(tc.run("run %b &long"), "OK");
    assert_eq!(tc.run("pause %b"), "OK");
    assert_eq!(
        tc.run("add.item &long more"),
        "Error: Routine &long is locked by %b (paused)"
    );

    assert_eq!(tc.run("stop %a"), "OK");
    tc.wait_for("status %a", WAIT, |s| s.starts_with("stopped"))
        .expect("a stopped");
    assert_eq!(
        tc.run("add.item &long more"),
        "Error: Routine &long is locked by %b (paused)"
    );

    assert_eq!(tc.run("stop %b"), "OK");
    tc.wait_for("add.item &long tail", WAIT, |s| s == "OK")
        .expect("unlocked");
}
