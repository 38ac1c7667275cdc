//! The Compute Server's half of the ancillary-fd handshake: receive the
//! Device Model's wake handle once per session, then bump it after every
//! completed request.

use std::io::IoSliceMut;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};

use nix::sys::socket::{recvmsg, ControlMessageOwned, MsgFlags};
use nix::unistd::write;

/// Reads one byte of payload plus the `SCM_RIGHTS`-carried descriptor from
/// `sock`. Returns `None` if the peer sent no ancillary data (a caller not
/// in notification mode connected anyway).
pub fn recv_wake_handle(sock: RawFd) -> nix::Result<Option<OwnedFd>> {
    let mut payload = [0u8; 1];
    let mut iov = [IoSliceMut::new(&mut payload)];
    let mut cmsg_buffer = nix::cmsg_space!([RawFd; 1]);
    let msg = recvmsg::<()>(sock, &mut iov, Some(&mut cmsg_buffer), MsgFlags::empty())?;

    for cmsg in msg.cmsgs()? {
        if let ControlMessageOwned::ScmRights(fds) = cmsg {
            if let Some(&fd) = fds.first() {
                // Safety: the kernel duplicated this descriptor for us as
                // part of the SCM_RIGHTS transfer; we own it from here.
                return Ok(Some(unsafe { OwnedFd::from_raw_fd(fd) }));
            }
        }
    }
    Ok(None)
}

pub fn notify(handle: &OwnedFd) -> nix::Result<()> {
    write(handle, &1u64.to_ne_bytes())?;
    Ok(())
}
