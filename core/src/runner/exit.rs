use std::process::ExitStatus;

use crate::error::RunnerError;

pub fn normalize_exit(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(code) = status.code() {
            code
        } else if let Some(sig) = status.signal() {
            128 + sig
        } else {
            1
        }
    }
    #[cfg(windows)]
    {
        status.code().unwrap_or(1)
    }
}

/// `None` when the child exited with code zero.
pub fn exit_error(status: ExitStatus) -> Option<RunnerError> {
    if status.success() {
        return None;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(code) = status.code() {
            Some(RunnerError::ChildExit { code })
        } else if let Some(signal) = status.signal() {
            Some(RunnerError::Signal { signal })
        } else {
            Some(RunnerError::ChildExit { code: 1 })
        }
    }
    #[cfg(windows)]
    {
        Some(RunnerError::ChildExit {
            code: status.code().unwrap_or(1),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn zero_exit_is_success() {
        let status = ExitStatus::from_raw(0);
        assert_eq!(normalize_exit(status), 0);
        assert!(exit_error(status).is_none());
    }

    #[test]
    fn nonzero_exit_keeps_code() {
        // wait(2) encoding: exit code in the high byte.
        let status = ExitStatus::from_raw(3 << 8);
        assert_eq!(normalize_exit(status), 3);
        assert!(matches!(exit_error(status), Some(RunnerError::ChildExit { code: 3 })));
    }

    #[test]
    fn signal_maps_to_128_plus() {
        let status = ExitStatus::from_raw(9);
        assert_eq!(normalize_exit(status), 137);
        assert!(matches!(exit_error(status), Some(RunnerError::Signal { signal: 9 })));
    }
}
