/// Signals used to ask a child to shut down before it gets killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GracefulSignal {
    /// - on `cfg(unix)`: `SIGINT`, as sent by a terminal on `Ctrl+C`.
    /// - on `cfg(windows)`: `CTRL_C_EVENT`.
    Interrupt,

    /// - on `cfg(unix)`: `SIGTERM`, as sent by the OS requesting a shutdown.
    /// - on `cfg(windows)`: `CTRL_BREAK_EVENT`.
    Terminate,
}

impl GracefulSignal {
    pub(crate) fn name(self) -> &'static str {
        match self {
            GracefulSignal::Interrupt => "SIGINT",
            GracefulSignal::Terminate => "SIGTERM",
        }
    }
}

/// Sends `signal` to the `child`.
///
/// Does nothing if the child was already polled to completion.
pub(crate) fn send(child: &tokio::process::Child, signal: GracefulSignal) -> std::io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };

    #[cfg(unix)]
    {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        let signal = match signal {
            GracefulSignal::Interrupt => Signal::SIGINT,
            GracefulSignal::Terminate => Signal::SIGTERM,
        };
        signal::kill(Pid::from_raw(pid as i32), signal).map_err(std::io::Error::other)
    }

    #[cfg(windows)]
    {
        use windows_sys::Win32::System::Console::{
            CTRL_BREAK_EVENT, CTRL_C_EVENT, GenerateConsoleCtrlEvent,
        };

        let event = match signal {
            GracefulSignal::Interrupt => CTRL_C_EVENT,
            GracefulSignal::Terminate => CTRL_BREAK_EVENT,
        };
        let success = unsafe { GenerateConsoleCtrlEvent(event, pid) };
        if success == 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(all(not(windows), not(unix)))]
    {
        let _ = (pid, signal);
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "Cannot send signals to processes on this platform",
        ))
    }
}
