//! Coordinator reaction to a worker that breaks the wire contract.

use std::time::Duration;

use tokio::time::timeout;

use polyfold_comm::traits::send_value;
use polyfold_comm::{CommError, LocalGroup};
use polyfold_core::{Convolution, WorkItem};
use polyfold_scheduler::protocol::{self, Command};
use polyfold_scheduler::{run_coordinator, CoordinatorConfig, SchedulerError};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn wrong_result_length_is_fatal_and_aborts_group() {
    let group = LocalGroup::create(2);
    let fake = group[1].clone();
    let worker = tokio::spawn(async move {
        let Command::Combine { len } = protocol::recv_command(&fake).await.unwrap() else {
            panic!("expected a task");
        };
        let len_b = protocol::recv_size(&fake).await.unwrap();
        protocol::recv_payload(&fake, len).await.unwrap();
        protocol::recv_payload(&fake, len_b).await.unwrap();

        // Correct answer has three coefficients.
        send_value(&fake, 0, protocol::RESULT, &vec![1i64, 2]).await.unwrap();

        protocol::recv_command(&fake).await
    });

    let seeds = vec![WorkItem::new(vec![1, 2]), WorkItem::new(vec![1, 3])];
    let err = timeout(
        TIMEOUT,
        run_coordinator(&group[0], &Convolution, seeds, &CoordinatorConfig::default()),
    )
    .await
    .unwrap()
    .unwrap_err();

    assert!(matches!(
        err,
        SchedulerError::Protocol { rank: 1, expected: 3, actual: 2 }
    ));

    let after = timeout(TIMEOUT, worker).await.unwrap().unwrap();
    assert!(matches!(
        after,
        Err(SchedulerError::Comm(CommError::Aborted { by: 0, .. }))
    ));
}

#[tokio::test]
async fn undecodable_result_is_fatal() {
    let group = LocalGroup::create(2);
    let fake = group[1].clone();
    tokio::spawn(async move {
        let _ = protocol::recv_command(&fake).await;
        send_value(&fake, 0, protocol::RESULT, &"not coefficients").await.unwrap();
    });

    let seeds = vec![WorkItem::new(vec![1]), WorkItem::new(vec![1])];
    let err = timeout(
        TIMEOUT,
        run_coordinator(&group[0], &Convolution, seeds, &CoordinatorConfig::default()),
    )
    .await
    .unwrap()
    .unwrap_err();

    assert!(matches!(err, SchedulerError::Comm(CommError::Deserialization(_))));
}
