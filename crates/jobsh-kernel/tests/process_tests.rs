//! End-to-end test with real child processes and the live signal relay.
//!
//! Kept as a single sequential test: SIGCHLD and waitpid are process-global,
//! so concurrent tests in one binary would steal each other's children.

use std::time::Duration;

use tokio::time::timeout;

use jobsh_kernel::{EvalFlow, Shell, ShellConfig};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn spawns_and_reaps_real_processes() {
    let shell = Shell::new(ShellConfig::default()).expect("signal handler install");

    // Foreground: eval returns only after the relay reaps the child.
    let flow = timeout(Duration::from_secs(10), shell.eval("true"))
        .await
        .expect("foreground job should finish")
        .unwrap();
    assert_eq!(flow, EvalFlow::Continue);
    assert!(shell.jobs().is_empty().await);

    // Unknown command: diagnostic, shell continues, nothing tracked.
    let flow = shell
        .eval("definitely-not-a-real-command-48151623")
        .await
        .unwrap();
    assert_eq!(flow, EvalFlow::Continue);
    assert!(shell.jobs().is_empty().await);

    // Background: eval returns immediately with the job registered, and the
    // relay drains it shortly after it exits.
    let flow = timeout(Duration::from_secs(2), shell.eval("sleep 0.2 &"))
        .await
        .expect("background eval must not block")
        .unwrap();
    assert_eq!(flow, EvalFlow::Continue);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !shell.jobs().is_empty().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "background job was never reaped"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // killall: the deferred broadcast interrupts every live job's group. A
    // zero delay fires the broadcast on the next timer tick.
    let flow = timeout(Duration::from_secs(2), shell.eval("sleep 30 &"))
        .await
        .expect("background eval must not block")
        .unwrap();
    assert_eq!(flow, EvalFlow::Continue);
    assert!(!shell.jobs().is_empty().await);

    let flow = timeout(Duration::from_secs(2), shell.eval("killall 0"))
        .await
        .expect("killall must not block")
        .unwrap();
    assert_eq!(flow, EvalFlow::Continue);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !shell.jobs().is_empty().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "killall broadcast never terminated the job"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
