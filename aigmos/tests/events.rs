//! Event bindings driven by the poller thread.

use std::thread;
use std::time::Duration;

use aigmos::test_support::TestConsole;

const WAIT: Duration = Duration::from_secs(10);

#[test]
fn runner_completion_fires_binding_once_per_pulse() {
    let tc = TestConsole::new().expect("console");
    tc.run("mk &build");
    tc.run("add.item &build mk $built");
    assert_eq!(tc.run("ON %build.trg 1 add.item $events:log done"), "OK");
    assert_eq!(tc.run("ON %build.trg 2 add.item $events:log failed"), "OK");

    tc.run("run %build");
    tc.wait_for("cat $events:log", WAIT, |s| s == "done")
        .expect("fired");
    tc.wait_for("status %build", WAIT, |s| s.ends_with("trg=0"))
        .expect("pulse cleared");
    thread::sleep(Duration::from_millis(50));
    assert_eq!(tc.run("cat $events:log"), "done");

    tc.run("run %build");
    tc.wait_for("cat $events:log", WAIT, |s| s == "donedone")
        .expect("re-armed");
}

#[test]
fn text_trigger_fires_rearms_and_purges() {
    let tc = TestConsole::new().expect("console");
    assert_eq!(tc.run("ON $flags:go.trg 2 add.item $seen:x hit"), "OK");

    tc.run("add.item $flags:go.trg 2");
    tc.wait_for("cat $seen:x", WAIT, |s| s == "hit")
        .expect("fired");

    tc.run("rm $flags");
    thread::sleep(Duration::from_millis(50));
    tc.run("add.item $flags:go.trg 2");
    tc.wait_for("cat $seen:x", WAIT, |s| s == "hithit")
        .expect("fired again");

    tc.run("rm $flags");
    tc.run("add.item $flags:go.trg 3");
    tc.wait_for("ON.show *.trg", WAIT, str::is_empty)
        .expect("purged");
}

#[test]
fn table_trigger_reads_leaf_values() {
    let tc = TestConsole::new().expect("console");
    tc.run("ON #ci:ready.trg 1 mk $ready");
    tc.run("add.item #ci:ready.trg 1");
    tc.wait_for("ls $", WAIT, |s| s == "ready").expect("fired");
}
