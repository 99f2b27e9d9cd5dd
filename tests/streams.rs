//! Integration tests for the stream layer as seen from outside the crate.
//!
//! Covers capability dispatch across the built-in backends, the sticky error state, the
//! endian codec on real files, and a backend implemented by a downstream crate.

use chunkio::prelude::*;
use chunkio::{BufferedIo, Capabilities, IoOffset, IoSize, ReadWriteMemory};
use std::io::{Read as _, SeekFrom, Write as _};
use tempfile::NamedTempFile;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn capabilities_of_built_in_backends() {
    let mut region = [0u8; 8];
    let mut vec = Vec::new();
    let ro = [0u8; 8];

    let rw = Stream::from_rw_memory(&mut region);
    assert!(rw.supports_read() && rw.supports_write() && rw.supports_seek());
    assert!(!rw.supports_buffered_read());

    let ro = Stream::from_ro_memory(&ro);
    assert!(ro.supports_read() && ro.supports_buffered_read() && ro.supports_size());
    assert!(!ro.supports_write());

    let vec = Stream::from_vec(&mut vec);
    assert_eq!(
        vec.capabilities(),
        Capabilities::SIZE | Capabilities::READ | Capabilities::WRITE | Capabilities::SEEK
    );
}

#[test]
fn unsupported_operation_is_sticky_until_reset() {
    init_logging();
    let data = [0x11u8, 0x22, 0x33, 0x44];
    let mut stream = Stream::from_ro_memory(&data);

    assert_eq!(stream.write(&[1]).error_code(), ErrorCode::InvalidOperation);
    assert_eq!(stream.error_state(), ErrorCode::InvalidOperation);

    // A read that would succeed still reports the first failure.
    let error = io::read_le::<u16>(&mut stream).unwrap_err();
    assert_eq!(error.code(), ErrorCode::InvalidOperation);

    assert_eq!(stream.reset_error_state(), ErrorCode::InvalidOperation);
    assert_eq!(stream.error_state(), ErrorCode::Success);
    assert_eq!(io::read_le::<u16>(&mut stream).unwrap(), 0x2211);
    assert_eq!(io::read_be::<u16>(&mut stream).unwrap(), 0x3344);
}

#[test]
fn fixed_region_reports_short_transfers() {
    let mut region = [0u8; 6];
    let mut stream = Stream::from_rw_memory(&mut region);

    assert!(io::write_le(&mut stream, 0xAABB_CCDDu32).is_ok());
    let result = io::write_le(&mut stream, 0x1122_3344u32);
    assert_eq!(result.value(), 2);
    assert_eq!(result.error_code(), ErrorCode::EndOfStream);

    // The short write is still reported in place of the new failure.
    assert_eq!(stream.seek(7, SeekOrigin::Begin).error_code(), ErrorCode::EndOfStream);
    assert_eq!(stream.reset_error_state(), ErrorCode::EndOfStream);
    assert_eq!(stream.seek(7, SeekOrigin::Begin).error_code(), ErrorCode::SeekError);
    drop(stream);

    assert_eq!(region, [0xDD, 0xCC, 0xBB, 0xAA, 0x44, 0x33]);
}

#[test]
fn vec_stream_grows_on_write_and_seek() {
    let mut storage = vec![1u8, 2];
    let mut stream = Stream::from_vec(&mut storage);

    assert_eq!(stream.seek(4, SeekOrigin::End).value(), 6);
    io::write_be(&mut stream, 0x0A0Bu16);
    assert_eq!(stream.size().value(), 8);

    assert_eq!(stream.seek(-1, SeekOrigin::Begin).error_code(), ErrorCode::SeekError);
    drop(stream);

    assert_eq!(storage, [1, 2, 0, 0, 0, 0, 0x0A, 0x0B]);
}

#[test]
fn codec_on_an_unbuffered_file() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let mut temp = NamedTempFile::new()?;
    let mut stream = Stream::from_file(temp.as_file_mut());

    io::write_le(&mut stream, -2i32);
    io::write_be(&mut stream, 1.5f64);
    io::write_enum(&mut stream, ByteOrder::Big, ByteOrder::Little);
    io::write_ordered(&mut stream, u64::MAX - 1, ByteOrder::Big);
    assert_eq!(stream.error_state(), ErrorCode::Success);

    assert_eq!(stream.seek(0, SeekOrigin::Begin).value(), 0);
    assert_eq!(io::read_le::<i32>(&mut stream)?, -2);
    assert_eq!(io::read_be::<f64>(&mut stream)?, 1.5);
    assert_eq!(io::read_enum::<ByteOrder>(&mut stream, ByteOrder::Little)?, ByteOrder::Big);

    // Failed reads leave the target untouched.
    let mut value = 7u64;
    assert!(io::read_ordered_into(&mut stream, &mut value, ByteOrder::Big).is_ok());
    assert_eq!(value, u64::MAX - 1);
    assert!(!io::read_le_into(&mut stream, &mut value).is_ok());
    assert_eq!(value, u64::MAX - 1);

    assert_eq!(stream.close(), ErrorCode::Success);
    Ok(())
}

#[test]
fn buffered_window_over_a_file() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let content: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    let mut temp = NamedTempFile::new()?;
    temp.write_all(&content)?;
    temp.flush()?;

    let mut file = std::fs::File::open(temp.path())?;
    let mut stream = Stream::new(BufferedFileReader::with_capacity(&mut file, 100));
    assert_eq!(stream.num_bytes_available(), 0);

    assert_eq!(stream.refill(), ErrorCode::Success);
    assert_eq!(stream.buffer(), &content[..100]);
    stream.consume(40);
    assert_eq!(stream.num_bytes_available(), 60);

    // Relative seeks account for the unread part of the window.
    assert_eq!(stream.seek(10, SeekOrigin::Current).value(), 50);
    assert_eq!(stream.num_bytes_available(), 0);

    let mut rest = vec![0u8; 950];
    let result = stream.buffered_read(&mut rest);
    assert_eq!(result.value(), 950);
    assert!(result.is_ok());
    assert_eq!(rest, &content[50..]);

    let mut past_end = [0u8; 4];
    let result = stream.read(&mut past_end);
    assert_eq!(result.value(), 0);
    assert_eq!(result.error_code(), ErrorCode::EndOfStream);

    // Terminal failure: the window now reports the stub and seeking stays failed.
    assert_eq!(stream.seek(0, SeekOrigin::Begin).error_code(), ErrorCode::EndOfStream);
    Ok(())
}

#[test]
fn std_io_traits_bridge_streams() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut storage = Vec::new();
    let mut stream = Stream::from_vec(&mut storage);
    stream.write_all(b"hello, stream")?;
    std::io::Seek::seek(&mut stream, SeekFrom::Start(7))?;

    let mut tail = String::new();
    stream.read_to_string(&mut tail)?;
    assert_eq!(tail, "stream");
    drop(stream);

    let mut stream = Stream::from_ro_memory(&storage);
    let mut copy = Vec::new();
    std::io::copy(&mut stream, &mut copy)?;
    assert_eq!(copy, storage);

    let mut region = [0u8; 2];
    let mut stream = Stream::new(ReadWriteMemory::new(&mut region));
    let error = stream.write_all(b"abc").unwrap_err();
    assert_eq!(error.kind(), std::io::ErrorKind::UnexpectedEof);
    Ok(())
}

/// A backend defined outside the crate: an endless run of one byte value.
struct Repeat {
    window: [u8; 16],
    position: IoSize,
}

impl Repeat {
    fn new(byte: u8) -> Repeat {
        Repeat {
            window: [byte; 16],
            position: 0,
        }
    }
}

impl Backend for Repeat {
    fn kind(&self) -> &'static str {
        "repeat"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SEEK | Capabilities::BUFFERED_READ
    }

    fn seek(&mut self, offset: IoOffset, origin: SeekOrigin, buffered: &mut BufferedIo) -> IoResult {
        let current = self.position - buffered.available() as IoSize;
        match origin.resolve(offset, current, IoSize::MAX) {
            Some(target) => {
                self.position = target;
                buffered.set_window(0, 0);
                IoResult::ok(target)
            }
            None => IoResult::error(ErrorCode::SeekError),
        }
    }

    fn window(&self) -> &[u8] {
        &self.window
    }

    fn refill(&mut self, buffered: &mut BufferedIo) -> ErrorCode {
        self.position += self.window.len() as IoSize;
        buffered.set_window(0, self.window.len());
        ErrorCode::Success
    }
}

#[test]
fn downstream_backend_plugs_into_the_codec() {
    init_logging();
    let mut stream = Stream::new(Repeat::new(0x01));
    assert!(stream.supports_read());
    assert_eq!(stream.size().error_code(), ErrorCode::InvalidOperation);
    stream.reset_error_state();

    assert_eq!(io::read_le::<u32>(&mut stream).unwrap(), 0x0101_0101);

    let mut large = vec![0u8; 100];
    assert_eq!(stream.read(&mut large).value(), 100);
    assert!(large.iter().all(|&b| b == 0x01));
    assert_eq!(stream.position().value(), 104);
}
