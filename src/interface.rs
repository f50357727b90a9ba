//! Hardware interface abstraction
//!
//! [`BusAdapter`] is the narrow contract the transfer pipeline drives: open a
//! window, stream pixels into it, read pixels back, and optionally run one
//! asynchronous write at a time. Anything that can move RGB565 words to a
//! panel can implement it (parallel buses, DMA-capable SPI peripherals,
//! simulators).
//!
//! [`SpiInterface`] is the reference adapter for 4-wire SPI controllers
//! speaking MIPI DCS, built on embedded-hal v1.0 traits.
//!
//! ## Example
//!
//! ```rust,no_run
//! use core::convert::Infallible;
//! use embedded_hal::delay::DelayNs;
//! use embedded_hal::digital::OutputPin;
//! use embedded_hal::spi::{Operation, SpiDevice};
//! use tft_render::{BusAdapter, SpiInterface};
//!
//! # struct MockSpi;
//! # impl embedded_hal::spi::ErrorType for MockSpi { type Error = Infallible; }
//! # impl SpiDevice for MockSpi {
//! #     fn transaction(
//! #         &mut self,
//! #         _operations: &mut [Operation<'_, u8>],
//! #     ) -> Result<(), Self::Error> {
//! #         Ok(())
//! #     }
//! # }
//! # struct MockPin;
//! # impl embedded_hal::digital::ErrorType for MockPin { type Error = Infallible; }
//! # impl OutputPin for MockPin {
//! #     fn set_low(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! #     fn set_high(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct MockDelay;
//! # impl DelayNs for MockDelay { fn delay_ns(&mut self, _ns: u32) {} }
//! # let mut delay = MockDelay;
//! let mut interface = SpiInterface::new(MockSpi, MockPin, MockPin);
//!
//! // Hardware reset and power-up sequence
//! let _ = interface.reset(&mut delay);
//! let _ = interface.init(&mut delay);
//!
//! // Stream a 2x2 red block
//! let _ = interface.open_window(0, 0, 1, 1);
//! let _ = interface.write_run(&[0xF800; 4]);
//! ```

use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{Operation, SpiDevice};

use crate::command::{
    CASET, COLMOD, COLMOD_16BIT, DISPON, MADCTL, RAMRD, RAMWR, RASET, SLPOUT, SWRESET, madctl,
};
use crate::config::Rotation;

type InterfaceResult<T, E> = core::result::Result<T, E>;

/// Pixels packed per SPI write
const CHUNK_PIXELS: usize = 32;

/// Trait for the bus that carries pixels to the panel
///
/// Coordinates are in the frame of the current rotation; adapters reprogram
/// the controller scan direction in [`set_rotation`](Self::set_rotation) so the
/// panel does the mapping. Pixels are native RGB565 values, the adapter decides
/// the wire byte order.
///
/// ## Implementing
///
/// Only the window, write and read methods are required. Adapters with an
/// asynchronous engine override [`supports_async`](Self::supports_async) and
/// the three async methods; the defaults complete every write synchronously.
pub trait BusAdapter {
    /// Error type for bus operations
    ///
    /// Must implement [`Debug`] for error reporting.
    type Error: Debug;

    /// Address the inclusive window `(x0, y0)..=(x1, y1)`
    ///
    /// Following writes and reads walk the window row by row.
    fn open_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16)
    -> InterfaceResult<(), Self::Error>;

    /// Write one pixel at the window cursor
    fn write_pixel(&mut self, pixel: u16) -> InterfaceResult<(), Self::Error>;

    /// Write a run of pixels at the window cursor
    fn write_run(&mut self, pixels: &[u16]) -> InterfaceResult<(), Self::Error>;

    /// Read the pixel at the window cursor
    fn read_pixel(&mut self) -> InterfaceResult<u16, Self::Error>;

    /// Hold the bus across several operations
    fn begin_transaction(&mut self) -> InterfaceResult<(), Self::Error> {
        Ok(())
    }

    /// Release the bus held by [`begin_transaction`](Self::begin_transaction)
    fn end_transaction(&mut self) -> InterfaceResult<(), Self::Error> {
        Ok(())
    }

    /// Program the panel scan direction for a rotation
    fn set_rotation(&mut self, rotation: Rotation) -> InterfaceResult<(), Self::Error> {
        let _ = rotation;
        Ok(())
    }

    /// Whether [`start_async_write`](Self::start_async_write) returns before the pixels are sent
    fn supports_async(&self) -> bool {
        false
    }

    /// Start writing `pixels` at the window cursor
    ///
    /// The caller keeps `pixels` alive and unmodified until
    /// [`is_async_busy`](Self::is_async_busy) reports false or
    /// [`wait_async`](Self::wait_async) returns.
    fn start_async_write(&mut self, pixels: &[u16]) -> InterfaceResult<(), Self::Error> {
        self.write_run(pixels)
    }

    /// Whether an asynchronous write is still running
    fn is_async_busy(&mut self) -> InterfaceResult<bool, Self::Error> {
        Ok(false)
    }

    /// Block until the asynchronous write completes
    fn wait_async(&mut self) -> InterfaceResult<(), Self::Error> {
        Ok(())
    }
}

/// Errors that can occur at the interface level
///
/// Generic over SPI and GPIO error types.
#[derive(Debug)]
pub enum InterfaceError<SpiErr, PinErr> {
    /// SPI communication error
    Spi(SpiErr),
    /// GPIO pin error
    Pin(PinErr),
}

impl<SpiErr: Debug, PinErr: Debug> core::fmt::Display for InterfaceError<SpiErr, PinErr> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Spi(e) => write!(f, "SPI error: {e:?}"),
            Self::Pin(e) => write!(f, "Pin error: {e:?}"),
        }
    }
}

impl<SpiErr: Debug, PinErr: Debug> core::error::Error for InterfaceError<SpiErr, PinErr> {}

/// Frame memory command last issued after a window change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MemoryAccess {
    Idle,
    Write,
    Read,
}

/// MIPI DCS adapter over SPI
///
/// Implements [`BusAdapter`] for embedded-hal v1.0 SPI and GPIO traits.
/// Pixels go out big-endian, packed into a small stack buffer. Reads use
/// `RAMRD` and convert the controller's 18-bit reply to RGB565.
///
/// ## Type Parameters
///
/// * `SPI` - SPI device implementing [`SpiDevice`]
/// * `DC` - Data/Command pin implementing [`OutputPin`]
/// * `RST` - Reset pin implementing [`OutputPin`]
pub struct SpiInterface<SPI, DC, RST> {
    /// SPI device for communication
    spi: SPI,
    /// Data/Command select pin (low=command, high=data)
    dc: DC,
    /// Reset pin (active low)
    rst: RST,
    /// Panel wired blue-first
    bgr: bool,
    /// Memory command in effect for the open window
    access: MemoryAccess,
}

impl<SPI, DC, RST, PinErr> SpiInterface<SPI, DC, RST>
where
    SPI: SpiDevice,
    SPI::Error: Debug,
    DC: OutputPin<Error = PinErr>,
    RST: OutputPin<Error = PinErr>,
    PinErr: Debug,
{
    /// Create a new SpiInterface
    ///
    /// # Arguments
    ///
    /// * `spi` - SPI device (must implement [`SpiDevice`])
    /// * `dc` - Data/Command pin (output, low=command, high=data)
    /// * `rst` - Reset pin (output, active low)
    pub fn new(spi: SPI, dc: DC, rst: RST) -> Self {
        Self {
            spi,
            dc,
            rst,
            bgr: false,
            access: MemoryAccess::Idle,
        }
    }

    /// Select blue-first colour order for MADCTL
    pub fn set_bgr(&mut self, bgr: bool) -> &mut Self {
        self.bgr = bgr;
        self
    }

    /// Whether blue-first colour order is selected
    pub fn bgr(&self) -> bool {
        self.bgr
    }

    /// Give back the SPI device and pins
    pub fn release(self) -> (SPI, DC, RST) {
        (self.spi, self.dc, self.rst)
    }

    /// Send a command byte with DC low
    pub fn send_command(&mut self, command: u8) -> InterfaceResult<(), InterfaceError<SPI::Error, PinErr>> {
        self.dc.set_low().map_err(InterfaceError::Pin)?;
        self.spi.write(&[command]).map_err(InterfaceError::Spi)?;
        Ok(())
    }

    /// Send parameter or pixel bytes with DC high
    pub fn send_data(&mut self, data: &[u8]) -> InterfaceResult<(), InterfaceError<SPI::Error, PinErr>> {
        self.dc.set_high().map_err(InterfaceError::Pin)?;
        self.spi.write(data).map_err(InterfaceError::Spi)?;
        Ok(())
    }

    /// Hardware reset
    ///
    /// RST high 5ms, low 20ms, then high with 150ms for the controller to
    /// come up.
    pub fn reset<D: DelayNs>(&mut self, delay: &mut D) -> InterfaceResult<(), InterfaceError<SPI::Error, PinErr>> {
        self.rst.set_high().map_err(InterfaceError::Pin)?;
        delay.delay_ms(5);
        self.rst.set_low().map_err(InterfaceError::Pin)?;
        delay.delay_ms(20);
        self.rst.set_high().map_err(InterfaceError::Pin)?;
        delay.delay_ms(150);
        self.access = MemoryAccess::Idle;
        Ok(())
    }

    /// Power-up sequence
    ///
    /// Software reset, sleep out, 16-bit pixels, default scan direction and
    /// display on.
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> InterfaceResult<(), InterfaceError<SPI::Error, PinErr>> {
        self.send_command(SWRESET)?;
        delay.delay_ms(120);
        self.send_command(SLPOUT)?;
        delay.delay_ms(120);
        self.send_command(COLMOD)?;
        self.send_data(&[COLMOD_16BIT])?;
        self.send_command(MADCTL)?;
        self.send_data(&[madctl(Rotation::Rotate0, self.bgr)])?;
        self.send_command(DISPON)?;
        delay.delay_ms(20);
        self.access = MemoryAccess::Idle;
        log::debug!("panel initialised (bgr: {})", self.bgr);
        Ok(())
    }

    fn send_range(&mut self, command: u8, start: u16, end: u16) -> InterfaceResult<(), InterfaceError<SPI::Error, PinErr>> {
        self.send_command(command)?;
        let [s0, s1] = start.to_be_bytes();
        let [e0, e1] = end.to_be_bytes();
        self.send_data(&[s0, s1, e0, e1])
    }
}

/// RGB565 from the 6-bit-per-channel bytes returned by RAMRD
fn rgb666_to_565(r: u8, g: u8, b: u8) -> u16 {
    (u16::from(r & 0xF8) << 8) | (u16::from(g & 0xFC) << 3) | u16::from(b >> 3)
}

impl<SPI, DC, RST, PinErr> BusAdapter for SpiInterface<SPI, DC, RST>
where
    SPI: SpiDevice,
    SPI::Error: Debug,
    DC: OutputPin<Error = PinErr>,
    RST: OutputPin<Error = PinErr>,
    PinErr: Debug,
{
    type Error = InterfaceError<SPI::Error, PinErr>;

    fn open_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> InterfaceResult<(), Self::Error> {
        self.send_range(CASET, x0, x1)?;
        self.send_range(RASET, y0, y1)?;
        self.access = MemoryAccess::Idle;
        Ok(())
    }

    fn write_pixel(&mut self, pixel: u16) -> InterfaceResult<(), Self::Error> {
        self.write_run(&[pixel])
    }

    fn write_run(&mut self, pixels: &[u16]) -> InterfaceResult<(), Self::Error> {
        if pixels.is_empty() {
            return Ok(());
        }
        if self.access != MemoryAccess::Write {
            self.send_command(RAMWR)?;
            self.access = MemoryAccess::Write;
        }
        self.dc.set_high().map_err(InterfaceError::Pin)?;

        let mut bytes = [0u8; CHUNK_PIXELS * 2];
        for chunk in pixels.chunks(CHUNK_PIXELS) {
            for (out, pixel) in bytes.chunks_exact_mut(2).zip(chunk) {
                out.copy_from_slice(&pixel.to_be_bytes());
            }
            self.spi
                .write(&bytes[..chunk.len() * 2])
                .map_err(InterfaceError::Spi)?;
        }
        Ok(())
    }

    fn read_pixel(&mut self) -> InterfaceResult<u16, Self::Error> {
        let mut rgb = [0u8; 3];
        if self.access != MemoryAccess::Read {
            self.send_command(RAMRD)?;
            self.access = MemoryAccess::Read;
            self.dc.set_high().map_err(InterfaceError::Pin)?;
            let mut dummy = [0u8; 1];
            self.spi
                .transaction(&mut [Operation::Read(&mut dummy), Operation::Read(&mut rgb)])
                .map_err(InterfaceError::Spi)?;
        } else {
            self.spi.read(&mut rgb).map_err(InterfaceError::Spi)?;
        }
        Ok(rgb666_to_565(rgb[0], rgb[1], rgb[2]))
    }

    fn set_rotation(&mut self, rotation: Rotation) -> InterfaceResult<(), Self::Error> {
        let value = madctl(rotation, self.bgr);
        self.send_command(MADCTL)?;
        self.send_data(&[value])?;
        self.access = MemoryAccess::Idle;
        Ok(())
    }
}
