#![no_std]
#![no_main]

use defmt::{error, info, warn};
use defmt_rtt as _;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_time::{Duration, Ticker};
use embassy_usb::class::hid::State;
use embassy_usb::{Builder, Config as UsbConfig};
use grip_keyboard_rp2040::{
    configure_usb_hid, ControllerPort, EdgeSampler, GripBridge, InputEmitter, Keymap, PortDecoder,
    PortId, UsbKeyboardOutput, STATS_INTERVAL_SECS,
};
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

type PortPins = ControllerPort<Input<'static>, Input<'static>>;

/// Per-port samplers, shared between the sampler tasks and the bridge.
static SAMPLERS: [EdgeSampler; 2] = [EdgeSampler::new(), EdgeSampler::new()];

/// High-priority executor for the sampler tasks.
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

/// USB device configuration buffers.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// HID state.
static HID_STATE: StaticCell<State> = StaticCell::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("GRiP-to-Keyboard starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- Keymaps: a bad table must stop us before anything runs ---
    let (js1_keymap, js2_keymap) = match (Keymap::js1(), Keymap::js2()) {
        (Ok(js1), Ok(js2)) => (js1, js2),
        (Err(e), _) | (_, Err(e)) => defmt::panic!("Invalid keymap: {:?}", e),
    };

    // --- Controller ports ---
    let js1 = ControllerPort::new(
        PortId::Js1,
        Input::new(p.PIN_2, Pull::Up), // JS1 clock
        Input::new(p.PIN_3, Pull::Up), // JS1 data
    );
    let js2 = ControllerPort::new(
        PortId::Js2,
        Input::new(p.PIN_4, Pull::Up), // JS2 clock
        Input::new(p.PIN_5, Pull::Up), // JS2 data
    );

    // --- USB Setup ---
    let usb_driver = Driver::new(p.USB, Irqs);

    let mut usb_config = UsbConfig::new(0x1209, 0x0001); // pid.codes test VID/PID
    usb_config.manufacturer = Some("Rust Gamepad");
    usb_config.product = Some("GRiP-to-Keyboard Adapter");
    usb_config.serial_number = Some("001");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let config_descriptor = CONFIG_DESCRIPTOR.init([0; 256]);
    let bos_descriptor = BOS_DESCRIPTOR.init([0; 256]);
    let msos_descriptor = MSOS_DESCRIPTOR.init([0; 256]);
    let control_buf = CONTROL_BUF.init([0; 64]);

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        config_descriptor,
        bos_descriptor,
        msos_descriptor,
        control_buf,
    );

    // Configure HID class
    let hid_state = HID_STATE.init(State::new());
    let hid_writer = configure_usb_hid(&mut builder, hid_state);

    // Build the USB device
    let usb_device = builder.build();

    // Create output and bridge
    let keyboard = UsbKeyboardOutput::new(hid_writer);
    let bridge = GripBridge::new(
        PortDecoder::new(PortId::Js1, &SAMPLERS[PortId::Js1.index()], js1_keymap),
        PortDecoder::new(PortId::Js2, &SAMPLERS[PortId::Js2.index()], js2_keymap),
        keyboard,
    );

    // Samplers preempt the thread executor. Each edge still costs a wake and
    // a re-arm of the pin wait; an edge inside that window is dropped.
    interrupt::SWI_IRQ_1.set_priority(Priority::P1);
    let high_spawner = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    high_spawner.spawn(sampler_task(js1, &SAMPLERS[PortId::Js1.index()]).unwrap());
    high_spawner.spawn(sampler_task(js2, &SAMPLERS[PortId::Js2.index()]).unwrap());

    // Spawn tasks (unwrap the SpawnToken, then spawn)
    spawner.spawn(usb_task(usb_device).unwrap());
    spawner.spawn(bridge_task(bridge).unwrap());
    spawner.spawn(stats_task().unwrap());

    info!("GRiP-to-Keyboard initialized, waiting for packets...");
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: embassy_usb::UsbDevice<'static, Driver<'static, USB>>) {
    device.run().await;
}

/// Sampler task - feeds one port's falling clock edges into its sampler.
#[embassy_executor::task(pool_size = 2)]
async fn sampler_task(mut port: PortPins, sampler: &'static EdgeSampler) {
    let id = port.id();
    info!("{:?} sampler running", id);
    if let Err(e) = port.run(sampler).await {
        error!("{:?} sampler stopped: {:?}", id, e);
    }
}

/// Bridge task - decodes packets from both ports and types them over USB.
#[embassy_executor::task]
async fn bridge_task(mut bridge: GripBridge<'static, UsbKeyboardOutput<'static>>) {
    // Wait for USB to be ready
    bridge.emitter_mut().wait_ready().await;
    info!("USB HID ready, forwarding key events...");

    loop {
        if let Err(e) = bridge.process_one().await {
            error!("Output error: {:?}", e);
            if !bridge.emitter().is_ready() {
                bridge.emitter_mut().wait_ready().await;
                match bridge.refresh().await {
                    Ok(()) => info!("USB HID back, held keys re-sent"),
                    Err(e) => warn!("Refresh failed: {:?}", e),
                }
            }
        }
    }
}

/// Statistics task - periodically logs per-port sampler counters.
#[embassy_executor::task]
async fn stats_task() {
    let mut ticker = Ticker::every(Duration::from_secs(STATS_INTERVAL_SECS));
    loop {
        ticker.next().await;
        for port in PortId::ALL {
            let stats = SAMPLERS[port.index()].stats();
            if stats.desyncs > 0 || stats.overwritten > 0 {
                warn!("{:?}: {:?}", port, stats);
            } else {
                info!("{:?}: {:?}", port, stats);
            }
        }
    }
}
