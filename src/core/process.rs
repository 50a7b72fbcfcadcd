//! Process supervision - killing yt-dlp takes its children with it
//!
//! yt-dlp shells out to ffmpeg for merging and post-processing. Killing only
//! the direct child would leave ffmpeg running and holding the output file,
//! so every tool process is started inside a kernel grouping object:
//!
//! - Windows: a Job Object created with `JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE`.
//! - Unix: a fresh process group led by the child, killed with `killpg`.
//! - Elsewhere: no grouping; only the direct child is killed. Descendants
//!   may outlive a cancelled operation on such targets.

use std::ffi::OsStr;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Command for running the tool in the background with all pipes captured
pub fn command(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    configure_for_background(&mut cmd);
    cmd
}

#[cfg(windows)]
fn configure_for_background(cmd: &mut Command) {
    // Prevent console windows from popping up while the tool runs.
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn configure_for_background(_cmd: &mut Command) {}

/// Whether this target can kill a whole process tree
pub const fn supports_tree_kill() -> bool {
    cfg!(any(unix, windows))
}

/// Grouping handle for one tool process and everything it spawns.
///
/// Call [`configure`](Self::configure) before spawning and
/// [`assign`](Self::assign) right after. [`terminate_all`](Self::terminate_all)
/// may be called any number of times; [`release`](Self::release) runs on drop.
pub struct ProcessTree {
    inner: imp::Tree,
}

impl ProcessTree {
    pub fn new() -> Self {
        Self {
            inner: imp::Tree::new(),
        }
    }

    /// Prepare a command so its process can join the group
    pub fn configure(&self, cmd: &mut Command) {
        self.inner.configure(cmd);
    }

    /// Put a freshly spawned child into the group
    pub fn assign(&mut self, child: &Child) {
        self.inner.assign(child);
    }

    /// Forcefully kill every member. Never fails; problems are logged.
    pub fn terminate_all(&self) {
        self.inner.terminate_all();
    }

    /// Drop the grouping object. Members still alive are killed, so a
    /// dropped operation never leaves ffmpeg behind.
    pub fn release(&mut self) {
        self.inner.release();
    }
}

impl Default for ProcessTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessTree {
    fn drop(&mut self) {
        self.release();
    }
}

/// Kill the group and the direct child, whatever the platform supports
pub fn force_kill(tree: &ProcessTree, child: &mut Child) {
    tree.terminate_all();
    if let Err(e) = child.start_kill() {
        // Already exited and reaped
        tracing::debug!("start_kill: {}", e);
    }
}

#[cfg(unix)]
mod imp {
    use tokio::process::{Child, Command};

    pub struct Tree {
        pgid: Option<libc::pid_t>,
    }

    impl Tree {
        pub fn new() -> Self {
            Self { pgid: None }
        }

        pub fn configure(&self, cmd: &mut Command) {
            // Child becomes leader of a new group whose id equals its pid
            cmd.process_group(0);
        }

        pub fn assign(&mut self, child: &Child) {
            self.pgid = child.id().and_then(|pid| libc::pid_t::try_from(pid).ok());
            if self.pgid.is_none() {
                tracing::warn!("child exited before it could be tracked; tree kill disabled");
            }
        }

        pub fn terminate_all(&self) {
            let Some(pgid) = self.pgid else {
                return;
            };
            // SAFETY: killpg has no memory-safety preconditions.
            let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
            if rc == 0 {
                tracing::debug!(pgid, "killed process group");
            } else {
                let err = std::io::Error::last_os_error();
                // ESRCH: the whole group is already gone
                if err.raw_os_error() != Some(libc::ESRCH) {
                    tracing::warn!(pgid, "killpg failed: {}", err);
                }
            }
        }

        /// Same contract as closing a kill-on-close job: stragglers die
        pub fn release(&mut self) {
            self.terminate_all();
            self.pgid = None;
        }
    }
}

#[cfg(windows)]
mod imp {
    use std::ffi::c_void;
    use tokio::process::{Child, Command};
    use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
    use windows_sys::Win32::System::JobObjects::{
        AssignProcessToJobObject, CreateJobObjectW, JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE,
        JOBOBJECT_EXTENDED_LIMIT_INFORMATION, JobObjectExtendedLimitInformation,
        SetInformationJobObject, TerminateJobObject,
    };

    pub struct Tree {
        job: HANDLE,
    }

    // SAFETY: a job handle is a kernel object reference usable from any thread.
    unsafe impl Send for Tree {}
    unsafe impl Sync for Tree {}

    impl Tree {
        pub fn new() -> Self {
            // SAFETY: null attributes and name are documented as valid.
            let job = unsafe { CreateJobObjectW(std::ptr::null(), std::ptr::null()) };
            if job.is_null() {
                tracing::warn!(
                    "CreateJobObjectW failed: {}; falling back to single-process kill",
                    std::io::Error::last_os_error()
                );
                return Self { job };
            }

            // SAFETY: the struct is plain data; all-zero is a valid value.
            let mut info: JOBOBJECT_EXTENDED_LIMIT_INFORMATION = unsafe { std::mem::zeroed() };
            info.BasicLimitInformation.LimitFlags = JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE;
            // SAFETY: `info` outlives the call and the length matches its type.
            let ok = unsafe {
                SetInformationJobObject(
                    job,
                    JobObjectExtendedLimitInformation,
                    &info as *const _ as *const c_void,
                    std::mem::size_of::<JOBOBJECT_EXTENDED_LIMIT_INFORMATION>() as u32,
                )
            };
            if ok == 0 {
                tracing::warn!("SetInformationJobObject failed: {}", std::io::Error::last_os_error());
            }
            Self { job }
        }

        pub fn configure(&self, _cmd: &mut Command) {}

        pub fn assign(&mut self, child: &Child) {
            if self.job.is_null() {
                return;
            }
            let Some(handle) = child.raw_handle() else {
                return;
            };
            // SAFETY: both handles are live for the duration of the call.
            let ok = unsafe { AssignProcessToJobObject(self.job, handle as HANDLE) };
            if ok == 0 {
                tracing::warn!("AssignProcessToJobObject failed: {}", std::io::Error::last_os_error());
            }
        }

        pub fn terminate_all(&self) {
            if self.job.is_null() {
                return;
            }
            // SAFETY: the job handle is open until release().
            let ok = unsafe { TerminateJobObject(self.job, 1) };
            if ok == 0 {
                tracing::debug!("TerminateJobObject failed: {}", std::io::Error::last_os_error());
            }
        }

        pub fn release(&mut self) {
            if self.job.is_null() {
                return;
            }
            // SAFETY: closed exactly once, then nulled.
            unsafe { CloseHandle(self.job) };
            self.job = std::ptr::null_mut();
        }
    }
}

#[cfg(not(any(unix, windows)))]
mod imp {
    use tokio::process::{Child, Command};

    pub struct Tree;

    impl Tree {
        pub fn new() -> Self {
            Self
        }

        pub fn configure(&self, _cmd: &mut Command) {}

        pub fn assign(&mut self, _child: &Child) {}

        pub fn terminate_all(&self) {}

        pub fn release(&mut self) {}
    }
}
