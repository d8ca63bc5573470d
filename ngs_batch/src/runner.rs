use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    os::unix::io::FromRawFd,
    os::unix::process::{CommandExt, ExitStatusExt},
    process::{Child, Command, Stdio},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::sink::OutputSink;

/// Exit code reported when a job could not be launched or its output
/// stream broke down.  Distinct from any code a tool would return itself.
pub const LAUNCH_FAILED: i32 = -1;

/// Cooperative cancellation flag shared between the foreground and the
/// batch worker.  The foreground only ever sets it; the worker clears it
/// before each job and the runner polls it at line boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs one command to completion, streaming its output to a sink
pub trait JobRunner: Send + Sync {
    fn run(&self, argv: &[String], sink: &dyn OutputSink, cancel: &CancelToken) -> i32;
}

/// Launches the command in its own process group, merges stdout and
/// stderr into a single pipe and forwards complete lines to the sink in
/// arrival order.  All failures are reported through the sink and folded
/// into the exit code; this never panics or returns an error to the
/// caller.
pub struct ProcessRunner {
    can_signal_group: bool,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            can_signal_group: cfg!(unix),
        }
    }

    /// Ask the whole process group to terminate, falling back to the
    /// child alone if group signalling is unavailable or fails
    fn terminate(&self, child: &mut Child, sink: &dyn OutputSink) {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        let pid = child.id() as libc::pid_t;
        if self.can_signal_group {
            if unsafe { libc::killpg(pid, libc::SIGTERM) } == 0 {
                return;
            }
            sink.append(&format!(
                "could not signal process group: {}\n",
                io::Error::last_os_error()
            ));
        }
        if unsafe { libc::kill(pid, libc::SIGTERM) } != 0 {
            let _ = child.kill();
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRunner for ProcessRunner {
    fn run(&self, argv: &[String], sink: &dyn OutputSink, cancel: &CancelToken) -> i32 {
        let Some((prog, args)) = argv.split_first() else {
            sink.append("cannot run an empty command\n");
            return LAUNCH_FAILED;
        };

        let (reader, out_io, err_io) = match merged_pipe() {
            Ok(t) => t,
            Err(e) => {
                sink.append(&format!("could not create output pipe: {}\n", e));
                return LAUNCH_FAILED;
            }
        };

        let mut cmd = Command::new(prog);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(out_io)
            .stderr(err_io)
            // Own process group so the tool and anything it forks can be
            // terminated together
            .process_group(0);

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                sink.append(&format!("failed to launch {}: {}\n", prog, e));
                return LAUNCH_FAILED;
            }
        };
        // The Command keeps our copies of the pipe write ends alive; close
        // them or the reader never sees end of file
        drop(cmd);

        trace!("Started {} (pid {})", prog, child.id());

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut failed = false;
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => sink.append(&String::from_utf8_lossy(&buf)),
                Err(e) => {
                    sink.append(&format!("error reading tool output: {}\n", e));
                    self.terminate(&mut child, sink);
                    failed = true;
                    break;
                }
            }
            if cancel.is_set() {
                self.terminate(&mut child, sink);
                sink.append("[interrupted]\n");
                // The process may still be draining; stop reading and reap
                break;
            }
        }
        drop(reader);

        let code = match child.wait() {
            Ok(status) => status
                .code()
                .unwrap_or_else(|| status.signal().map(|s| -s).unwrap_or(LAUNCH_FAILED)),
            Err(e) => {
                sink.append(&format!("failed to collect exit status: {}\n", e));
                LAUNCH_FAILED
            }
        };
        debug!("Process {} finished with code {}", prog, code);

        if failed {
            LAUNCH_FAILED
        } else {
            code
        }
    }
}

/// One pipe whose write end is shared by the child's stdout and stderr,
/// so the combined stream keeps the order the process wrote in
fn merged_pipe() -> io::Result<(File, Stdio, Stdio)> {
    let mut fds = [0 as libc::c_int; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let reader = unsafe { File::from_raw_fd(fds[0]) };
    let writer = unsafe { File::from_raw_fd(fds[1]) };
    let err_writer = writer.try_clone()?;
    Ok((reader, Stdio::from(writer), Stdio::from(err_writer)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn sh(script: &str) -> Vec<String> {
        vec![
            String::from("/bin/sh"),
            String::from("-c"),
            String::from(script),
        ]
    }

    #[test]
    fn streams_merged_output_in_order() {
        let sink = MemorySink::new();
        let code = ProcessRunner::new().run(
            &sh("echo one; echo two >&2; echo three"),
            &sink,
            &CancelToken::new(),
        );
        assert_eq!(code, 0);
        assert_eq!(sink.contents(), "one\ntwo\nthree\n");
    }

    #[test]
    fn reports_native_exit_code() {
        let sink = MemorySink::new();
        let code = ProcessRunner::new().run(&sh("exit 3"), &sink, &CancelToken::new());
        assert_eq!(code, 3);
    }

    #[test]
    fn signal_death_becomes_negative_code() {
        let sink = MemorySink::new();
        let code = ProcessRunner::new().run(&sh("kill -TERM $$"), &sink, &CancelToken::new());
        assert_eq!(code, -libc::SIGTERM);
    }

    #[test]
    fn launch_failure_is_reported_not_raised() {
        let sink = MemorySink::new();
        let code = ProcessRunner::new().run(
            &[String::from("/no/such/program_0b9f")],
            &sink,
            &CancelToken::new(),
        );
        assert_eq!(code, LAUNCH_FAILED);
        assert!(sink.contents().contains("failed to launch"));
    }

    #[test]
    fn empty_argv_is_rejected() {
        let sink = MemorySink::new();
        let code = ProcessRunner::new().run(&[], &sink, &CancelToken::new());
        assert_eq!(code, LAUNCH_FAILED);
    }

    #[test]
    fn cancel_terminates_the_process_group() {
        let sink = MemorySink::new();
        let cancel = CancelToken::new();
        cancel.set();
        // Without the group SIGTERM the trailing echo would still run
        let code = ProcessRunner::new().run(
            &sh("echo started; sleep 30; echo finished"),
            &sink,
            &cancel,
        );
        assert_eq!(code, -libc::SIGTERM);
        let out = sink.contents();
        assert!(out.contains("started"));
        assert!(out.contains("[interrupted]"));
        assert!(!out.contains("finished"));
    }
}
