//! Worker loop: receive two operands, combine, reply, repeat until `Stop`.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use polyfold_comm::{Communicator, Rank, COORDINATOR};
use polyfold_core::Combiner;

use crate::error::SchedulerError;
use crate::protocol::{self, Command};

/// Summary of a worker's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub rank: Rank,
    /// Tasks combined and returned.
    pub tasks: u64,
}

/// Serve combine requests from the coordinator until it sends `Stop`.
///
/// Receives nothing after `Stop`. A failure other than an abort raised
/// elsewhere aborts the group.
pub async fn run_worker<C, K>(comm: &C, combiner: &K) -> Result<WorkerReport, SchedulerError>
where
    C: Communicator + ?Sized,
    K: Combiner + ?Sized,
{
    let rank = comm.rank();
    info!(rank, "worker started");
    match serve(comm, combiner).await {
        Ok(tasks) => {
            info!(rank, tasks, "worker stopped");
            Ok(WorkerReport { rank, tasks })
        }
        Err(e) if e.is_abort() => {
            warn!(rank, error = %e, "worker released by group abort");
            Err(e)
        }
        Err(e) => {
            error!(rank, error = %e, "worker failed, aborting group");
            comm.abort(&e.to_string()).await;
            Err(e)
        }
    }
}

async fn serve<C, K>(comm: &C, combiner: &K) -> Result<u64, SchedulerError>
where
    C: Communicator + ?Sized,
    K: Combiner + ?Sized,
{
    if comm.rank() == COORDINATOR {
        return Err(SchedulerError::Logic(format!(
            "rank {COORDINATOR} is the coordinator and cannot serve tasks"
        )));
    }

    let mut tasks = 0;
    loop {
        let len_a = match protocol::recv_command(comm).await? {
            Command::Stop => return Ok(tasks),
            Command::Combine { len } => len,
        };
        let len_b = protocol::recv_size(comm).await?;
        let a = protocol::recv_payload(comm, len_a).await?;
        let b = protocol::recv_payload(comm, len_b).await?;

        let result = combiner.combine(&a, &b);
        debug!(rank = comm.rank(), len_a, len_b, len = result.len(), "combined");
        protocol::send_result(comm, &result).await?;
        tasks += 1;
    }
}

#[cfg(test)]
mod tests {
    use polyfold_comm::traits::send_value;
    use polyfold_comm::{CommError, LocalGroup};
    use polyfold_core::{Convolution, WorkItem};

    use super::*;

    #[tokio::test]
    async fn serves_tasks_until_stop() {
        let group = LocalGroup::create(2);
        let coordinator = &group[0];
        let a = WorkItem::new(vec![1, 2]);
        let b = WorkItem::new(vec![1, 3]);
        protocol::send_task(coordinator, 1, &a, &b).await.unwrap();
        protocol::send_task(coordinator, 1, &WorkItem::new(vec![5]), &WorkItem::new(vec![7]))
            .await
            .unwrap();
        protocol::send_stop(coordinator, 1).await.unwrap();

        let report = run_worker(&group[1], &Convolution).await.unwrap();
        assert_eq!(report, WorkerReport { rank: 1, tasks: 2 });

        let first = coordinator.recv(1, protocol::RESULT).await.unwrap();
        assert_eq!(first.decode::<Vec<i64>>().unwrap(), vec![1, 5, 6]);
        let second = coordinator.recv(1, protocol::RESULT).await.unwrap();
        assert_eq!(second.decode::<Vec<i64>>().unwrap(), vec![35]);
    }

    #[tokio::test]
    async fn nothing_is_received_after_stop() {
        let group = LocalGroup::create(2);
        protocol::send_stop(&group[0], 1).await.unwrap();
        protocol::send_stop(&group[0], 1).await.unwrap();

        run_worker(&group[1], &Convolution).await.unwrap();
        assert_eq!(group[1].pending(), 1);
    }

    #[tokio::test]
    async fn short_payload_aborts_group() {
        let group = LocalGroup::create(2);
        send_value(&group[0], 1, protocol::COMMAND, &Command::Combine { len: 3 })
            .await
            .unwrap();
        send_value(&group[0], 1, protocol::SIZE, &1usize).await.unwrap();
        send_value(&group[0], 1, protocol::PAYLOAD, &vec![1i64]).await.unwrap();

        let err = run_worker(&group[1], &Convolution).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Protocol { expected: 3, actual: 1, .. }));

        let seen = group[0].recv(1, protocol::RESULT).await;
        assert!(matches!(seen, Err(CommError::Aborted { by: 1, .. })));
    }

    #[tokio::test]
    async fn abort_from_coordinator_releases_worker() {
        let group = LocalGroup::create(2);
        group[0].abort("shutting down").await;

        let err = run_worker(&group[1], &Convolution).await.unwrap_err();
        assert!(err.is_abort());
    }

    #[tokio::test]
    async fn coordinator_rank_cannot_serve() {
        let group = LocalGroup::create(2);
        let err = run_worker(&group[0], &Convolution).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Logic(_)));
    }
}
