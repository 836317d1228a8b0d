use std::{borrow::Cow, io};

use crate::{Deserialize, Serialize, specs::WorkerReport};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

const ERR: Header = 0;
const CONTROL: Header = 1;
const GRADIENT: Header = 2;
const MODEL: Header = 3;
const REPORT: Header = 4;

const REPORT_SIZE: usize = size_of::<[f64; WorkerReport::FIELDS]>();

/// The length of a model message frame for a model of `num_params` parameters,
/// the largest frame either side of a run ever sends.
pub fn model_frame_len(num_params: usize) -> usize {
    num_params
        .saturating_add(2)
        .saturating_mul(size_of::<f32>())
        .saturating_add(HEADER_SIZE)
}

/// The payload data for the `Data` variant of the `Msg` enum.
///
/// Every shape travels over the same connection, the kind header is what tells them apart.
#[derive(Debug)]
pub enum Payload<'a> {
    /// Exactly `D` values, worker to coordinator.
    Gradient(&'a [f32]),
    /// Exactly `D + 2` values, coordinator to worker, see `ModelFrame`.
    Model(&'a [f32]),
    /// A worker's contribution to the epoch boundary reduction, raw `f64`s so that
    /// diverged (non finite) losses reach the coordinator as they are.
    Report(WorkerReport),
}

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// First message of a worker, announces the size of its model.
    Join { num_params: usize },
    /// The coordinator's answer to an accepted `Join`.
    Welcome { worker_id: usize },
    /// The worker is done and is about to close the connection.
    Disconnect,
}

/// The application layer message for the entire system.
#[derive(Debug)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload<'a>),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    /// A short name of the message kind, for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Control(Command::Join { .. }) => "control/join",
            Msg::Control(Command::Welcome { .. }) => "control/welcome",
            Msg::Control(Command::Disconnect) => "control/disconnect",
            Msg::Data(Payload::Gradient(_)) => "data/gradient",
            Msg::Data(Payload::Model(_)) => "data/model",
            Msg::Data(Payload::Report(_)) => "data/report",
            Msg::Err(_) => "err",
        }
    }

    fn buf_is_too_small<T>(size: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {HEADER_SIZE} bytes"),
        ))
    }

    fn invalid_kind<T>(kind: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind header {kind}"),
        ))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        match self {
            Msg::Err(e) => {
                buf.extend_from_slice(&ERR.to_be_bytes());
                Some(e.as_bytes())
            }
            Msg::Control(cmd) => {
                buf.extend_from_slice(&CONTROL.to_be_bytes());

                // SAFETY: Serialize impl for `Command` is derived and not implemented
                //         by hand. Nor has a non string-key map inside.
                serde_json::to_writer(buf, cmd).unwrap();
                None
            }
            Msg::Data(Payload::Gradient(grad)) => {
                buf.extend_from_slice(&GRADIENT.to_be_bytes());
                Some(bytemuck::cast_slice(*grad))
            }
            Msg::Data(Payload::Model(frame)) => {
                buf.extend_from_slice(&MODEL.to_be_bytes());
                Some(bytemuck::cast_slice(*frame))
            }
            Msg::Data(Payload::Report(report)) => {
                buf.extend_from_slice(&REPORT.to_be_bytes());
                buf.extend_from_slice(bytemuck::bytes_of(&report.to_values()));
                None
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Self::buf_is_too_small(buf.len());
        }

        let (kind_buf, rest) = buf.split_at(HEADER_SIZE);

        // SAFETY: We splitted the buffer to be of size `HEADER_SIZE` just above.
        let kind = Header::from_be_bytes(kind_buf.try_into().unwrap());

        match kind {
            ERR => {
                let text = std::str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(text)))
            }
            CONTROL => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            GRADIENT | MODEL => {
                let nums = bytemuck::try_cast_slice(rest).map_err(|err| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Numeric payload of {} bytes is not a valid f32 slice: {err}", rest.len()),
                    )
                })?;

                let payload = match kind {
                    GRADIENT => Payload::Gradient(nums),
                    _ => Payload::Model(nums),
                };

                Ok(Self::Data(payload))
            }
            REPORT => {
                if rest.len() != REPORT_SIZE {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Report payload of {} bytes, expected {REPORT_SIZE}", rest.len()),
                    ));
                }

                let values = bytemuck::pod_read_unaligned(rest);
                Ok(Self::Data(Payload::Report(WorkerReport::from_values(values))))
            }
            other => Self::invalid_kind(other),
        }
    }
}
