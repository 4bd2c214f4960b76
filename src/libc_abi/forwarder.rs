use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use crate::libc_abi::registry::CallId;

/// The struct passed through the forwarder for one call: ID, argument
/// count, up to eight argument words, a return slot, and an error code
/// (`spec.md` §3 "Libc call descriptor").
#[derive(Debug, Clone, Copy)]
pub struct CallDescriptor {
    pub call_id: u16,
    pub arg_count: u8,
    pub args: [u64; 8],
    pub return_slot: u64,
    pub error_code: i32,
}

impl CallDescriptor {
    #[must_use]
    pub fn new(call_id: u16, args: &[u64]) -> Self {
        let mut buf = [0u64; 8];
        let n = args.len().min(8);
        buf[..n].copy_from_slice(&args[..n]);
        Self {
            call_id,
            arg_count: n as u8,
            args: buf,
            return_slot: 0,
            error_code: 0,
        }
    }
}

/// Per-category call statistics, incremented by the forwarder on each
/// successful dispatch (`spec.md` §4.6 "Dispatch").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwarderStats {
    pub total_calls: u64,
    pub memory_calls: u64,
    pub string_calls: u64,
    pub file_calls: u64,
    pub io_calls: u64,
    pub printf_calls: u64,
}

/// The libc forwarder. Global process-wide state (`spec.md` §9 "Global
/// statistics state") becomes explicit instance state owned by this
/// handle, passed by reference into every dispatch, matching the
/// language-neutral redesign the spec calls for.
#[derive(Debug)]
pub struct LibcForwarder {
    initialized: bool,
    stats: ForwarderStats,
}

impl Default for LibcForwarder {
    fn default() -> Self {
        Self::new()
    }
}

impl LibcForwarder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            initialized: false,
            stats: ForwarderStats::default(),
        }
    }

    /// Idempotent; calling `init` twice is a no-op the second time.
    pub fn init(&mut self) {
        if !self.initialized {
            log::debug!("libc forwarder initialized");
            self.initialized = true;
        }
    }

    /// Resets statistics and the initialized flag.
    pub fn cleanup(&mut self) {
        self.stats = ForwarderStats::default();
        self.initialized = false;
    }

    #[must_use]
    pub fn stats(&self) -> ForwarderStats {
        self.stats
    }

    /// Dispatches one call. `memory` is the VM's instruction-region byte
    /// slice, used to resolve pointer-valued arguments that address
    /// embedded `CONST_STRING` bytes (`spec.md` §4.6 "Argument
    /// marshalling").
    pub fn dispatch(&mut self, descriptor: &mut CallDescriptor, memory: &[u8]) {
        let Ok(id) = CallId::try_from(descriptor.call_id) else {
            log::warn!("libc forwarder: unknown call id 0x{:04x}", descriptor.call_id);
            descriptor.error_code = -1;
            descriptor.return_slot = 0;
            return;
        };

        self.stats.total_calls += 1;
        bump_category(&mut self.stats, id);

        let result = unsafe { dispatch_unsafe(id, descriptor, memory) };
        match result {
            Ok(value) => {
                descriptor.return_slot = value;
                descriptor.error_code = 0;
            }
            Err(code) => {
                descriptor.return_slot = 0;
                descriptor.error_code = code;
            }
        }
    }
}

fn bump_category(stats: &mut ForwarderStats, id: CallId) {
    use CallId as C;
    match id {
        C::Malloc | C::Free | C::Calloc | C::Realloc => stats.memory_calls += 1,
        C::Strlen
        | C::Strcpy
        | C::Strncpy
        | C::Strcmp
        | C::Strcat
        | C::Strchr
        | C::Strstr
        | C::Strdup
        | C::Strtok
        | C::Strrchr
        | C::Memcpy
        | C::Memmove
        | C::Memset
        | C::Memcmp => stats.string_calls += 1,
        C::Fopen | C::Fclose | C::Fread | C::Fwrite | C::Fseek | C::Ftell | C::Feof | C::Ferror => {
            stats.file_calls += 1;
        }
        C::Printf => {
            stats.printf_calls += 1;
            stats.io_calls += 1;
        }
        C::Fprintf
        | C::Sprintf
        | C::Snprintf
        | C::Scanf
        | C::Fscanf
        | C::Sscanf
        | C::Puts
        | C::Putchar
        | C::Getchar
        | C::Fgetc
        | C::Fputc
        | C::Fgets
        | C::Fputs => stats.io_calls += 1,
        _ => {}
    }
}

/// Reads a NUL-terminated string embedded in the instruction stream at
/// `addr` (`spec.md` §4.4 "Constants", `CONST_STRING`).
unsafe fn cstr_at<'a>(memory: &'a [u8], addr: u64) -> Option<&'a CStr> {
    let start = usize::try_from(addr).ok()?;
    let bytes = memory.get(start..)?;
    CStr::from_bytes_until_nul(bytes).ok()
}

/// Short, synchronous wrappers around host C-runtime functions
/// (`spec.md` §4.6 "Dispatch"). Each handler performs no allocation beyond
/// what the host function itself requires, except where an owned
/// `CString` copy is unavoidable to satisfy the FFI boundary safely.
unsafe fn dispatch_unsafe(id: CallId, desc: &CallDescriptor, memory: &[u8]) -> Result<u64, i32> {
    match id {
        CallId::Puts => {
            let Some(s) = cstr_at(memory, desc.args[0]) else {
                return Err(-1);
            };
            let owned = CString::new(s.to_bytes()).map_err(|_| -1)?;
            let rc = libc::puts(owned.as_ptr());
            Ok(rc as u64)
        }
        CallId::Putchar => {
            let c = desc.args[0] as i32;
            Ok(libc::putchar(c) as u64)
        }
        CallId::Printf => dispatch_printf(desc, memory),
        CallId::Strlen => {
            let Some(s) = cstr_at(memory, desc.args[0]) else {
                return Err(-1);
            };
            Ok(s.to_bytes().len() as u64)
        }
        CallId::Atoi => {
            let Some(s) = cstr_at(memory, desc.args[0]) else {
                return Err(-1);
            };
            Ok(libc::atoi(s.as_ptr()) as u64)
        }
        CallId::Abs => {
            let value = desc.args[0] as i32;
            Ok(libc::abs(value) as u64)
        }
        CallId::Sqrt => {
            let bits = desc.args[0];
            let input = f64::from_bits(bits);
            Ok(input.sqrt().to_bits())
        }
        CallId::Exit => {
            let code = desc.args[0] as i32;
            std::process::exit(code);
        }
        CallId::Getenv => {
            let Some(s) = cstr_at(memory, desc.args[0]) else {
                return Err(-1);
            };
            let owned = CString::new(s.to_bytes()).map_err(|_| -1)?;
            let ptr = libc::getenv(owned.as_ptr());
            Ok(ptr as u64)
        }
        CallId::Rand => Ok(libc::rand() as u64),
        CallId::Srand => {
            libc::srand(desc.args[0] as u32);
            Ok(0)
        }
        CallId::Time => Ok(libc::time(std::ptr::null_mut()) as u64),
        _ => {
            log::debug!(
                "libc forwarder: {} is registered but not wired to a host handler",
                id.canonical_name()
            );
            Err(-1)
        }
    }
}

/// `printf` is variadic; stable Rust cannot define a variadic FFI
/// function, but it can *call* one. The fixed arities below cover the
/// argument counts this core ever produces.
unsafe fn dispatch_printf(desc: &CallDescriptor, memory: &[u8]) -> Result<u64, i32> {
    let Some(fmt) = cstr_at(memory, desc.args[0]) else {
        return Err(-1);
    };
    let fmt = CString::new(fmt.to_bytes()).map_err(|_| -1)?;
    let fmt_ptr = fmt.as_ptr() as *const c_char;

    let rc = match desc.arg_count {
        1 => libc::printf(fmt_ptr),
        2 => libc::printf(fmt_ptr, desc.args[1]),
        3 => libc::printf(fmt_ptr, desc.args[1], desc.args[2]),
        4 => libc::printf(fmt_ptr, desc.args[1], desc.args[2], desc.args[3]),
        5 => libc::printf(fmt_ptr, desc.args[1], desc.args[2], desc.args[3], desc.args[4]),
        _ => {
            log::warn!("printf: unsupported argument count {}", desc.arg_count);
            return Err(-1);
        }
    };
    Ok(rc as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_call_id_sets_error_code() {
        let mut forwarder = LibcForwarder::new();
        let mut desc = CallDescriptor::new(0xDEAD, &[]);
        forwarder.dispatch(&mut desc, &[]);
        assert_eq!(desc.error_code, -1);
        assert_eq!(desc.return_slot, 0);
    }

    #[test]
    fn strlen_reads_embedded_bytes() {
        let mut forwarder = LibcForwarder::new();
        let memory = b"hello\0".to_vec();
        let mut desc = CallDescriptor::new(CallId::Strlen as u16, &[0]);
        forwarder.dispatch(&mut desc, &memory);
        assert_eq!(desc.return_slot, 5);
        assert_eq!(desc.error_code, 0);
        assert_eq!(forwarder.stats().string_calls, 1);
    }

    #[test]
    fn init_is_idempotent() {
        let mut forwarder = LibcForwarder::new();
        forwarder.init();
        forwarder.init();
        assert!(forwarder.initialized);
    }

    #[test]
    fn cleanup_resets_stats_and_flag() {
        let mut forwarder = LibcForwarder::new();
        forwarder.init();
        let memory = b"hi\0".to_vec();
        let mut desc = CallDescriptor::new(CallId::Strlen as u16, &[0]);
        forwarder.dispatch(&mut desc, &memory);
        forwarder.cleanup();
        assert_eq!(forwarder.stats(), ForwarderStats::default());
        assert!(!forwarder.initialized);
    }
}
