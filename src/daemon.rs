use std::{io, process};

/// Detach from the controlling terminal: fork and exit the parent,
/// start a new session, close the standard descriptors.
///
/// Must run before the async runtime is built; forking a process with
/// live runtime threads is undefined behaviour territory.
pub fn daemonize() -> io::Result<()> {
    // SAFETY: the process is still single-threaded at this point
    let pid = unsafe { libc::fork() };

    if pid < 0 {
        return Err(io::Error::last_os_error());
    }

    if pid > 0 {
        process::exit(0);
    }

    if unsafe { libc::setsid() } < 0 {
        return Err(io::Error::last_os_error());
    }

    for fd in 0..=2 {
        // SAFETY: closing the standard descriptors of our own process
        unsafe { libc::close(fd) };
    }

    Ok(())
}
