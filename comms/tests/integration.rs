use std::borrow::Cow;

use comms::{
    ControlFlags, ModelFrame,
    msg::{Msg, Payload},
    specs::WorkerReport,
};
use tokio::io;

#[tokio::test]
async fn gradient_and_model_share_a_connection() -> io::Result<()> {
    const SIZE: usize = 256;

    let (one, two) = io::duplex(SIZE);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);
    let (rx2, tx2) = io::split(two);
    let (mut rx, _) = comms::channel(rx2, tx2);

    let grad = [1.0, 2.0, 3.0];
    let frame = ModelFrame::encode(&[4.0, 5.0, 6.0], ControlFlags::at(true, true));

    let sender = async move {
        tx.send(&Msg::Data(Payload::Gradient(&grad))).await?;
        tx.send(&Msg::Data(Payload::Model(&frame))).await?;
        Ok::<_, io::Error>(())
    };

    let receiver = async move {
        let mut buf: Vec<f32> = Vec::new();

        let msg: Msg = rx.recv_into(&mut buf).await?;
        let Msg::Data(Payload::Gradient(got)) = msg else {
            panic!("unexpected message {msg:?}");
        };
        assert_eq!(got, [1.0, 2.0, 3.0]);

        let msg: Msg = rx.recv_into(&mut buf).await?;
        let Msg::Data(Payload::Model(raw)) = msg else {
            panic!("unexpected message {msg:?}");
        };

        let frame = ModelFrame::decode(raw, 3)?;
        assert_eq!(frame.params, [4.0, 5.0, 6.0]);
        assert!(frame.flags.epoch_done);
        assert!(frame.flags.training_done);
        Ok::<_, io::Error>(())
    };

    tokio::try_join!(sender, receiver)?;
    Ok(())
}

#[tokio::test]
async fn reports_and_errors_roundtrip() -> io::Result<()> {
    let (one, two) = io::duplex(1024);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);
    let (rx2, tx2) = io::split(two);
    let (mut rx, _) = comms::channel(rx2, tx2);

    let report = WorkerReport {
        examples: 100.,
        metric_sum: 90.,
        loss_sum: 12.5,
        working_time: 0.75,
        waiting_time: 0.25,
    };

    tx.send(&Msg::Data(Payload::Report(report))).await?;
    tx.send(&Msg::Err(Cow::Borrowed("dimension mismatch"))).await?;

    let mut buf: Vec<f32> = Vec::new();
    let msg: Msg = rx.recv_into(&mut buf).await?;
    let Msg::Data(Payload::Report(got)) = msg else {
        panic!("unexpected message {msg:?}");
    };
    assert_eq!(got, report);

    let msg: Msg = rx.recv_into(&mut buf).await?;
    let Msg::Err(text) = msg else {
        panic!("unexpected message {msg:?}");
    };
    assert_eq!(text, "dimension mismatch");

    Ok(())
}

#[tokio::test]
async fn closed_peer_is_an_io_error() {
    let (one, two) = io::duplex(64);
    drop(one);

    let (rx2, tx2) = io::split(two);
    let (mut rx, _) = comms::channel(rx2, tx2);

    let mut buf: Vec<f32> = Vec::new();
    let res: io::Result<Msg> = rx.recv_into(&mut buf).await;
    let err = res.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
}

#[tokio::test]
async fn oversized_frame_is_rejected_before_allocating() {
    use tokio::io::AsyncWriteExt;

    let (mut one, two) = io::duplex(64);
    let (rx2, tx2) = io::split(two);
    let (mut rx, _) = comms::channel(rx2, tx2);

    one.write_all(&(1u64 << 40).to_be_bytes()).await.unwrap();

    let mut buf: Vec<f32> = Vec::new();
    let res: io::Result<Msg> = rx.recv_into(&mut buf).await;
    assert_eq!(res.unwrap_err().kind(), std::io::ErrorKind::InvalidData);
    assert_eq!(buf.capacity(), 0);
}

#[tokio::test]
async fn large_models_need_the_dimension_first() -> io::Result<()> {
    const PARAMS: usize = 20_000;

    let params = vec![0.5; PARAMS];
    let frame = ModelFrame::encode(&params, ControlFlags::default());

    for known in [false, true] {
        let (one, two) = io::duplex(1024);
        let (rx, tx) = io::split(one);
        let (_, mut tx) = comms::channel(rx, tx);
        let (rx2, tx2) = io::split(two);
        let (mut rx, _) = comms::channel(rx2, tx2);

        if known {
            rx.limit_to_model(PARAMS);
        }

        let frame = &frame;
        let sender = async move {
            // The receiver gives up on the header when the frame is too long.
            let _ = tx.send(&Msg::Data(Payload::Model(frame))).await;
        };

        let receiver = async move {
            let mut buf: Vec<f32> = Vec::new();
            let res: io::Result<Msg> = rx.recv_into(&mut buf).await;
            match res {
                Ok(Msg::Data(Payload::Model(raw))) => {
                    assert!(known);
                    assert_eq!(ModelFrame::decode(raw, PARAMS)?.params.len(), PARAMS);
                }
                Ok(msg) => panic!("unexpected message {msg:?}"),
                Err(err) => {
                    assert!(!known);
                    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
                }
            }

            Ok::<_, io::Error>(())
        };

        let ((), res) = tokio::join!(sender, receiver);
        res?;
    }

    Ok(())
}
