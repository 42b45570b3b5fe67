//! USB HID keyboard emitter implementation.

use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_usb::class::hid::{Config, HidBootProtocol, HidSubclass, HidWriter, State};
use embassy_usb::Builder;
use grip_core::{EmitError, InputEmitter, KeyEvent, KeyboardReport, KeyboardState};
use usbd_hid::descriptor::{KeyboardReport as HidKeyboardReport, SerializedDescriptor};

type UsbDriver<'d> = Driver<'d, USB>;

/// USB HID keyboard output.
///
/// Wraps an embassy-usb HID writer and the set of currently held keys.
/// Every accepted event sends a full boot keyboard report, so a dropped
/// report is corrected by the next one.
pub struct UsbKeyboardOutput<'d> {
    writer: HidWriter<'d, UsbDriver<'d>, { KeyboardReport::SIZE }>,
    keys: KeyboardState,
    ready: bool,
}

impl<'d> UsbKeyboardOutput<'d> {
    /// Create a new USB keyboard output from the given HID writer.
    pub fn new(writer: HidWriter<'d, UsbDriver<'d>, { KeyboardReport::SIZE }>) -> Self {
        Self {
            writer,
            keys: KeyboardState::new(),
            ready: false,
        }
    }

    /// Wait until the device is ready (USB enumerated).
    pub async fn wait_ready(&mut self) {
        self.writer.ready().await;
        self.ready = true;
    }

    async fn write_report(&mut self) -> Result<(), EmitError> {
        let report = self.keys.report();
        self.writer.write(&report.as_bytes()).await.map_err(|_| {
            self.ready = false;
            EmitError::Io
        })
    }
}

impl InputEmitter for UsbKeyboardOutput<'_> {
    async fn emit(&mut self, event: &KeyEvent) -> Result<(), EmitError> {
        // Track the key even while disconnected; `refresh` sends it later.
        if !self.keys.apply(event)? {
            return Ok(());
        }
        if !self.ready {
            return Err(EmitError::NotReady);
        }
        self.write_report().await
    }

    async fn refresh(&mut self) -> Result<(), EmitError> {
        if !self.ready {
            return Err(EmitError::NotReady);
        }
        self.write_report().await
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

/// Configure the USB HID boot keyboard class in the USB builder.
///
/// Returns the HID writer for use by the application.
pub fn configure_usb_hid<'d>(
    builder: &mut Builder<'d, UsbDriver<'d>>,
    state: &'d mut State<'d>,
) -> HidWriter<'d, UsbDriver<'d>, { KeyboardReport::SIZE }> {
    let config = Config {
        report_descriptor: HidKeyboardReport::desc(),
        request_handler: None,
        poll_ms: 1,
        max_packet_size: KeyboardReport::SIZE as u16,
        hid_subclass: HidSubclass::Boot,
        hid_boot_protocol: HidBootProtocol::Keyboard,
    };

    HidWriter::new(builder, state, config)
}
