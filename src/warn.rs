//! Printing diagnostics to stderr

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether `trace!` prints. Set via `set_trace`, or at engine
/// construction from the `VUEGO_TRACE` env var.
pub static VUEGO_TRACE: AtomicBool = AtomicBool::new(false);

pub fn set_trace(on: bool) {
    VUEGO_TRACE.store(on, Ordering::Relaxed);
}

pub fn trace_enabled() -> bool {
    VUEGO_TRACE.load(Ordering::Relaxed)
}

#[macro_export]
macro_rules! warn {
    ($formatstr:expr $(,$arg:expr)*) => { {
        use std::io::Write;
        let mut outp = std::io::BufWriter::new(std::io::stderr().lock());
        let _ = write!(&mut outp, "W: ");
        let _ = write!(&mut outp, $formatstr $(,$arg)*);
        let _ = writeln!(&mut outp, " at {:?} line {}", file!(), line!());
        let _ = outp.flush();
    } }
}


/// Like `warn!`, but only printing when tracing is switched on.
#[macro_export]
macro_rules! trace {
    ($formatstr:expr $(,$arg:expr)*) => { {
        if $crate::warn::trace_enabled() {
            use std::io::Write;
            let mut outp = std::io::BufWriter::new(std::io::stderr().lock());
            let _ = write!(&mut outp, "{:?} T: ", std::thread::current().id());
            let _ = write!(&mut outp, $formatstr $(,$arg)*);
            let _ = writeln!(&mut outp, " at {:?} line {}", file!(), line!());
            let _ = outp.flush();
        }
    } }
}
