//! Remote path classification.
//!
//! FTP has no portable stat, so directory-ness is probed: `CWD` into the path
//! and `CWD` back to where we were. Success means directory; any error means
//! "not a directory". The probe cannot tell a file from a path that does not
//! exist at all, so a dangling path is misclassified as a file and the later
//! download fails. The file mirror compensates with an `exists` check against
//! the parent listing before giving the error back to the retry policy.

use suppaftp::FtpStream;
use tracing::trace;

/// `CWD` probe. Side-effect free: the working directory is restored before
/// returning, on the success path via an explicit `CWD` back and on the
/// failure path because the failed `CWD` never moved it.
pub fn probe_directory(stream: &mut FtpStream, path: &str) -> bool {
    let previous = match stream.pwd() {
        Ok(dir) => dir,
        Err(err) => {
            trace!("pwd failed during probe of {path}: {err}");
            return false;
        }
    };
    match stream.cwd(path) {
        Ok(()) => {
            if let Err(err) = stream.cwd(&previous) {
                trace!("could not cwd back to {previous} after probing {path}: {err}");
            }
            true
        }
        Err(_) => false,
    }
}
