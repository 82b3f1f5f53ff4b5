//! Firmata Board Connection
//!
//! Owns the serial link to the microcontroller. Writes are serialized through
//! a shared writer; a background task decodes everything the board sends.

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use servo_bridge_firmata::{codec, FirmataMessage, MessageDecoder, PinMode, ProtocolVersion};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::timeout;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, error, info, warn};

/// StandardFirmata's serial speed
pub const DEFAULT_BAUD: u32 = 57600;

/// Configuration for the board connection
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Serial device path (e.g., "/dev/ttyACM0" or "/dev/cu.usbserial-A5027JS7")
    pub port: String,
    /// Serial baud rate
    pub baud: u32,
    /// How long to wait for the firmware to report its protocol version
    pub handshake_timeout: Duration,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".into(),
            baud: DEFAULT_BAUD,
            // Opening the port resets most Arduinos, boot takes a couple of seconds
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

/// What the board has told us about itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardInfo {
    pub protocol: Option<ProtocolVersion>,
    pub firmware_version: Option<ProtocolVersion>,
    pub firmware_name: Option<String>,
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Handle to a Firmata board, shared by every driver on it
#[derive(Clone)]
pub struct FirmataBoard {
    writer: Arc<Mutex<BoxedWriter>>,
    info: Arc<RwLock<BoardInfo>>,
    version_rx: watch::Receiver<Option<ProtocolVersion>>,
}

impl FirmataBoard {
    /// Open the serial port and perform the version handshake
    pub async fn connect(config: &BoardConfig) -> Result<Self> {
        info!("[FIRMATA] Opening {} at {} baud", config.port, config.baud);

        let stream = tokio_serial::new(&config.port, config.baud)
            .open_native_async()
            .with_context(|| format!("failed to open serial port {}", config.port))?;

        let board = Self::from_stream(stream);
        board.handshake(config.handshake_timeout).await?;

        Ok(board)
    }

    /// Wrap an already open byte stream and start the reader task
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let info = Arc::new(RwLock::new(BoardInfo::default()));
        let (version_tx, version_rx) = watch::channel(None);

        tokio::spawn(read_loop(reader, info.clone(), version_tx));

        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            info,
            version_rx,
        }
    }

    /// Query the firmware and wait for its protocol version
    ///
    /// A board that stays silent is logged and tolerated; a link that closes
    /// during the wait is an error.
    pub async fn handshake(&self, wait: Duration) -> Result<()> {
        self.send(codec::report_version_query()).await?;
        self.send(codec::firmware_query()).await?;

        let mut version_rx = self.version_rx.clone();
        // Copy the version out so the watch guard is released here
        let outcome = timeout(wait, version_rx.wait_for(|v| v.is_some()))
            .await
            .map(|r| r.map(|version| *version));

        match outcome {
            Ok(Ok(version)) => {
                if let Some(v) = version {
                    info!("[FIRMATA] Board speaks protocol {}", v);
                }
                Ok(())
            }
            Ok(Err(_)) => Err(anyhow!("serial link closed during handshake")),
            Err(_) => {
                warn!(
                    "[FIRMATA] No protocol version after {:?}, continuing anyway",
                    wait
                );
                Ok(())
            }
        }
    }

    /// Write one encoded frame to the board
    pub async fn send(&self, frame: Bytes) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Change a pin's mode
    pub async fn set_pin_mode(&self, pin: u8, mode: PinMode) -> Result<()> {
        self.send(codec::set_pin_mode(pin, mode)?).await
    }

    /// Write an analog value (servo position in degrees for servo pins)
    pub async fn analog_write(&self, pin: u8, value: u16) -> Result<()> {
        self.send(codec::analog_write(pin, value)?).await
    }

    /// Configure a servo pin's pulse range in microseconds
    pub async fn servo_config(&self, pin: u8, min_pulse: u16, max_pulse: u16) -> Result<()> {
        self.send(codec::servo_config(pin, min_pulse, max_pulse)?)
            .await
    }

    /// Snapshot of what the board has reported
    pub async fn info(&self) -> BoardInfo {
        self.info.read().await.clone()
    }
}

/// Reader task: decode board output until the link closes
async fn read_loop<R>(
    mut reader: R,
    info: Arc<RwLock<BoardInfo>>,
    version_tx: watch::Sender<Option<ProtocolVersion>>,
) where
    R: AsyncRead + Unpin,
{
    let mut decoder = MessageDecoder::new();
    let mut buf = vec![0u8; 256];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                warn!("[FIRMATA] Serial link closed");
                break;
            }
            Ok(n) => {
                decoder.extend(&buf[..n]);

                // Process all complete messages
                loop {
                    match decoder.decode_next() {
                        Ok(Some(message)) => handle_message(message, &info, &version_tx).await,
                        Ok(None) => break,
                        Err(e) => {
                            warn!("[FIRMATA] Discarding input: {}", e);
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                error!("[FIRMATA] Read error: {}", e);
                break;
            }
        }
    }
}

async fn handle_message(
    message: FirmataMessage,
    info: &RwLock<BoardInfo>,
    version_tx: &watch::Sender<Option<ProtocolVersion>>,
) {
    match message {
        FirmataMessage::ProtocolVersion(version) => {
            debug!("[FIRMATA] Protocol version {}", version);
            info.write().await.protocol = Some(version);
            version_tx.send_replace(Some(version));
        }
        FirmataMessage::Firmware { version, name } => {
            info!("[FIRMATA] Firmware: {} {}", name, version);
            let mut info = info.write().await;
            info.firmware_version = Some(version);
            info.firmware_name = Some(name);
        }
        FirmataMessage::StringData(text) => {
            warn!("[FIRMATA] Board says: {}", text);
        }
        other => {
            debug!("[FIRMATA] Ignoring {:?}", other);
        }
    }
}
