// Patch application: window loop and instruction interpretation.
//
// The decoder owns three externally provided streams for the duration of a
// decode: the source input, the patch, and the output.  The file header is
// parsed eagerly at construction; `run()` then applies windows one at a
// time until the patch stream is exhausted.  A window is reconstructed in
// memory and committed to the output only once it validated, so a failed
// window leaves the output exactly as the previous window left it.

use std::io::{self, Read, Seek, SeekFrom, Write};

use log::debug;

use crate::cache::AddressCache;
use crate::code_table::{INST_ADD, INST_COPY, INST_NOOP, INST_RUN, default_code_table};
use crate::error::DecodeError;
use crate::header::Header;
use crate::reader::VcdReader;
use crate::section::SectionReader;
use crate::window::Window;

/// VCDIFF patch decoder over three byte streams.
///
/// `input` needs read+seek, `patch` read+seek, and `output` read+write+seek
/// (`Target`-relative windows read back previously emitted bytes).  Pass
/// `&mut stream` to keep ownership at the call site; the decoder never
/// closes any of the streams.  Strictly single-threaded: the caller must
/// not touch the streams while a `run()` is in progress.
pub struct Decoder<I, P, O> {
    input: I,
    patch: VcdReader<P>,
    output: O,
    header: Header,
    last_window: Option<Window>,
    cache: AddressCache,
    bytes_written: u64,
}

impl<I, P, O> Decoder<I, P, O>
where
    I: Read + Seek,
    P: Read + Seek,
    O: Read + Write + Seek,
{
    /// Construct a decoder and parse the patch header eagerly.
    ///
    /// Any header violation (bad magic, unsupported version or feature,
    /// unrecognized indicator bits) surfaces here, before `run()`.
    pub fn new(input: I, patch: P, output: O) -> Result<Self, DecodeError> {
        let mut patch = VcdReader::new(patch);
        let header = Header::read(&mut patch)?;
        Ok(Self {
            input,
            patch,
            output,
            header,
            last_window: None,
            cache: AddressCache::new(),
            bytes_written: 0,
        })
    }

    /// The parsed patch header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The most recently applied window, once `run()` has processed one.
    pub fn last_window(&self) -> Option<&Window> {
        self.last_window.as_ref()
    }

    /// Apply every window until the patch stream is exhausted.
    ///
    /// Fails on the first malformed window; output already committed by
    /// earlier windows stays in place (no rollback).
    pub fn run(&mut self) -> Result<(), DecodeError> {
        let mut index = 0u64;
        while self.patch.has_remaining()? {
            let window = Window::read(&mut self.patch, self.bytes_written)?;
            debug!(
                "window {index}: fields={:?} segment={}+{} target_len={}",
                window.fields,
                window.source_segment_offset,
                window.source_segment_length,
                window.target_window_length,
            );

            let target = self.apply_window(&window)?;
            self.output.write_all(&target)?;
            self.bytes_written += target.len() as u64;
            self.last_window = Some(window);
            index += 1;
        }
        Ok(())
    }

    /// Interpret one window's instruction section and return the
    /// reconstructed target bytes.
    fn apply_window(&mut self, window: &Window) -> Result<Vec<u8>, DecodeError> {
        let mut target = Vec::with_capacity(window.target_window_length as usize);
        // Materialized lazily: a window may declare a source segment that
        // no COPY ever touches, and the input stream must stay untouched
        // in that case.
        let mut segment: Option<Vec<u8>> = None;

        let table = default_code_table();
        let mut inst = SectionReader::new("instructions", &window.instructions);
        let mut data = SectionReader::new("data", &window.data);
        let mut addresses = SectionReader::new("addresses", &window.addresses);

        while !inst.is_exhausted() {
            let opcode = inst.read_byte()?;
            let entry = table[usize::from(opcode)];

            self.execute_half(
                entry.type1,
                entry.size1,
                window,
                &mut inst,
                &mut data,
                &mut addresses,
                &mut segment,
                &mut target,
            )?;
            if entry.type2 != INST_NOOP {
                self.execute_half(
                    entry.type2,
                    entry.size2,
                    window,
                    &mut inst,
                    &mut data,
                    &mut addresses,
                    &mut segment,
                    &mut target,
                )?;
            }
        }

        if target.len() as u64 != u64::from(window.target_window_length) {
            return Err(DecodeError::WindowLengthMismatch {
                expected: window.target_window_length,
                actual: target.len() as u64,
            });
        }

        if let Some(expected) = window.checksum {
            let actual = adler32(&target);
            if actual != expected {
                return Err(DecodeError::ChecksumMismatch { expected, actual });
            }
        }

        Ok(target)
    }

    /// Execute a single half-instruction of an opcode.
    #[allow(clippy::too_many_arguments)]
    fn execute_half(
        &mut self,
        itype: u8,
        table_size: u8,
        window: &Window,
        inst: &mut SectionReader<'_>,
        data: &mut SectionReader<'_>,
        addresses: &mut SectionReader<'_>,
        segment: &mut Option<Vec<u8>>,
        target: &mut Vec<u8>,
    ) -> Result<(), DecodeError> {
        // Size 0 in the table means the size follows as a varint.
        let size = if table_size == 0 {
            inst.read_u32()?
        } else {
            u32::from(table_size)
        };

        // An instruction may never push the window past its declared
        // length; catching it here bounds allocations by the window size.
        let produced = target.len() as u64 + u64::from(size);
        if produced > u64::from(window.target_window_length) {
            return Err(DecodeError::WindowLengthMismatch {
                expected: window.target_window_length,
                actual: produced,
            });
        }

        let size_usize = size as usize;
        match itype {
            INST_RUN => {
                let byte = data.read_byte()?;
                target.resize(target.len() + size_usize, byte);
            }

            INST_ADD => {
                let literal = data.read_slice(size_usize)?;
                target.extend_from_slice(literal);
            }

            _ => {
                let mode = itype - INST_COPY;
                let segment_len = window.source_segment_length;

                // Position in the window's address space: segment first,
                // then the target bytes produced so far.
                let here = segment_len + target.len() as u32;
                let addr = self.cache.decode(mode, addresses, here)?;

                if addr < segment_len {
                    if u64::from(addr) + u64::from(size) > u64::from(segment_len) {
                        return Err(DecodeError::MalformedInstructionStream(
                            "COPY spans the source segment boundary".into(),
                        ));
                    }
                    if segment.is_none() {
                        *segment = Some(self.load_segment(window)?);
                    }
                    let seg = segment.as_deref().unwrap_or(&[]);
                    target.extend_from_slice(&seg[addr as usize..addr as usize + size_usize]);
                } else {
                    let offset = (addr - segment_len) as usize;
                    if offset + size_usize <= target.len() {
                        target.extend_from_within(offset..offset + size_usize);
                    } else {
                        // Overlapping self-copy: the read range covers bytes
                        // this same instruction writes, so copy one byte at
                        // a time (run-length expansion).
                        for i in 0..size_usize {
                            let byte = target[offset + i];
                            target.push(byte);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Read the window's copy segment from the input stream, or from the
    /// bytes already emitted to the output for `Target`-relative windows.
    fn load_segment(&mut self, window: &Window) -> Result<Vec<u8>, DecodeError> {
        let len = window.source_segment_length as usize;
        let offset = u64::from(window.source_segment_offset);
        let mut buf = vec![0u8; len];

        if window.has_source() {
            self.input.seek(SeekFrom::Start(offset))?;
            self.input.read_exact(&mut buf).map_err(|e| {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    DecodeError::MalformedInstructionStream(format!(
                        "source segment [{offset}, +{len}) is out of bounds"
                    ))
                } else {
                    DecodeError::Io(e)
                }
            })?;
        } else {
            // Bounds were checked against the emitted byte count when the
            // window was parsed.
            self.output.seek(SeekFrom::Start(offset))?;
            self.output.read_exact(&mut buf)?;
            self.output.seek(SeekFrom::End(0))?;
        }

        Ok(buf)
    }
}

/// Apply an in-memory patch to an in-memory source, returning the target.
pub fn apply(source: &[u8], patch: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut output = io::Cursor::new(Vec::new());
    let mut decoder = Decoder::new(
        io::Cursor::new(source),
        io::Cursor::new(patch),
        &mut output,
    )?;
    decoder.run()?;
    drop(decoder);
    Ok(output.into_inner())
}

/// Adler-32 over a reconstructed window.
fn adler32(data: &[u8]) -> u32 {
    #[cfg(feature = "adler32")]
    {
        let mut hasher = simd_adler32::Adler32::new();
        hasher.write(data);
        hasher.finish()
    }
    #[cfg(not(feature = "adler32"))]
    {
        const MOD_ADLER: u32 = 65521;
        let mut a: u32 = 1;
        let mut b: u32 = 0;
        for &byte in data {
            a = (a + u32::from(byte)) % MOD_ADLER;
            b = (b + a) % MOD_ADLER;
        }
        (b << 16) | a
    }
}
