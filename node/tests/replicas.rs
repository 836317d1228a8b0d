use std::num::NonZeroUsize;

use comms::{
    MsgReceiver, MsgSender,
    specs::{InitSpec, ModelSpec, TrainingSpec},
};
use coordinator::{Coordinator, CoordinatorErr};
use futures::future::join_all;
use machine_learning::{Dataset, LinearModel, Model, SgdUpdater};
use rand::{SeedableRng, rngs::StdRng};
use tokio::io::{self, DuplexStream, ReadHalf, WriteHalf};
use worker::Worker;

type Rx = MsgReceiver<ReadHalf<DuplexStream>>;
type Tx = MsgSender<WriteHalf<DuplexStream>>;

const TRUTH: [f32; 4] = [0.5, -1.0, 2.0, 0.0];

fn channel_pair() -> ((Rx, Tx), (Rx, Tx)) {
    let (stream1, stream2) = io::duplex(4096);
    let (rx1, tx1) = io::split(stream1);
    let (rx2, tx2) = io::split(stream2);
    let chan1 = comms::channel(rx1, tx1);
    let chan2 = comms::channel(rx2, tx2);
    (chan1, chan2)
}

fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn training(workers: usize, group_size: usize, trace_lambda: Option<f32>) -> TrainingSpec {
    TrainingSpec {
        epochs: nz(3),
        iterations: nz(7),
        workers: nz(workers),
        mini_batch: nz(5),
        learning_rate: 0.3,
        learning_rate_decay: 1.0,
        group_size: nz(group_size),
        max_delay: nz(1),
        l1_lambda: None,
        trace_lambda,
        print_interval: nz(2),
        print_loss: true,
    }
}

fn model_spec() -> ModelSpec {
    ModelSpec {
        num_params: nz(TRUTH.len()),
        init: InitSpec::Normal {
            mean: 0.0,
            std_dev: 0.1,
            seed: 42,
        },
        output: None,
    }
}

/// Runs a whole training in process and checks every replica ends equal to the
/// coordinator's model.
async fn assert_replicas_agree(workers: usize, group_size: usize, trace_lambda: Option<f32>) {
    let spec = training(workers, group_size, trace_lambda);
    let model = LinearModel::from_spec(&model_spec()).unwrap();
    let mut coordinator = Coordinator::new(spec.clone(), model, SgdUpdater).unwrap();

    let mut ends = Vec::new();
    let mut replicas = Vec::new();

    for id in 0..workers {
        let ((rx, tx), coordinator_end) = channel_pair();
        let mut rng = StdRng::seed_from_u64(id as u64);
        let dataset = Dataset::synthetic(&mut rng, 40, &TRUTH, 0.0).unwrap();
        let model = LinearModel::from_spec(&model_spec()).unwrap();

        let worker = Worker::new(spec.mini_batch.get(), model, SgdUpdater, dataset, rx, tx).unwrap();
        replicas.push(worker);
        ends.push(coordinator_end);
    }

    let coordinate = async {
        for (rx, tx) in ends {
            coordinator.join(rx, tx).await?;
        }

        coordinator.train().await?;
        Ok::<_, CoordinatorErr>(())
    };

    let trainings = replicas.iter_mut().map(|worker| worker.train());
    let (coordinated, trained) = tokio::join!(coordinate, join_all(trainings));

    coordinated.unwrap();
    for res in trained {
        res.unwrap();
    }

    let expected = coordinator.model().params();
    for worker in &replicas {
        assert_eq!(worker.model().params(), expected);
    }

    assert_eq!(coordinator.statistics().samples().len(), 4);
}

#[tokio::test]
async fn replicas_match_after_every_run() {
    assert_replicas_agree(3, 2, None).await;
}

#[tokio::test]
async fn replicas_match_with_a_single_contributor_per_round() {
    assert_replicas_agree(4, 1, Some(0.01)).await;
}

#[tokio::test]
async fn replicas_match_with_full_groups() {
    assert_replicas_agree(2, 2, None).await;
}
