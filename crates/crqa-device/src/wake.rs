//! The completion wake handle: a kernel-managed event counter created by
//! the Device Model and handed to the Compute Server once, as an ancillary
//! file descriptor, over the IPC channel. The Compute Server bumps it by
//! one per completed request; the Device Model's event loop drains it.

use std::io::{IoSlice, IoSliceMut};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::eventfd::{EfdFlags, EventFd};
use nix::sys::socket::{recvmsg, sendmsg, ControlMessage, ControlMessageOwned, MsgFlags};
use nix::unistd::write as fd_write;

/// A process-local counter: writes to it accumulate; a read drains and
/// returns the accumulated total, blocking if it is currently zero.
#[derive(Debug)]
pub struct WakeCounter {
    fd: EventFd,
}

impl WakeCounter {
    pub fn new() -> nix::Result<Self> {
        let fd = EventFd::from_value_and_flags(0, EfdFlags::EFD_CLOEXEC)?;
        Ok(Self { fd })
    }

    pub fn notify(&self) -> nix::Result<()> {
        self.fd.write(1)?;
        Ok(())
    }

    /// Drains the counter, returning the accumulated value. Blocks until at
    /// least one increment has arrived.
    pub fn drain(&self) -> nix::Result<u64> {
        self.fd.read()
    }

    /// Non-blocking drain: the Device Model's event loop calls this on
    /// every tick rather than blocking the whole loop on one accelerator's
    /// completion. Returns `Ok(None)` if the counter is still zero.
    pub fn try_drain(&self) -> nix::Result<Option<u64>> {
        let mut fds = [PollFd::new(self.fd.as_fd(), PollFlags::POLLIN)];
        let ready = poll(&mut fds, PollTimeout::ZERO)?;
        if ready == 0 {
            return Ok(None);
        }
        Ok(Some(self.fd.read()?))
    }

    pub fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

/// Sends `handle` to the peer on `sock`, carried as `SCM_RIGHTS` alongside a
/// one-byte payload. Represents the one-shot capability grant described in
/// the ancillary-fd handshake, not a per-request field.
pub fn send_wake_handle(sock: RawFd, handle: BorrowedFd<'_>) -> nix::Result<()> {
    let raw = handle.as_raw_fd();
    let fds = [raw];
    let cmsg = [ControlMessage::ScmRights(&fds)];
    let payload = [b'E'];
    let iov = [IoSlice::new(&payload)];
    sendmsg::<()>(sock, &iov, &cmsg, MsgFlags::empty(), None)?;
    Ok(())
}

/// Bumps a wake handle received via `recv_wake_handle`, i.e. the far side
/// of the handshake from `WakeCounter::notify`. Exists for callers (tests,
/// anything standing in for the Compute Server) that only hold the fd, not
/// the owning `WakeCounter`.
pub fn notify(handle: &OwnedFd) -> nix::Result<()> {
    fd_write(handle, &1u64.to_ne_bytes())?;
    Ok(())
}

/// Receives a wake handle sent by `send_wake_handle`. Returns an owned fd
/// the caller takes responsibility for closing.
pub fn recv_wake_handle(sock: RawFd) -> nix::Result<OwnedFd> {
    let mut payload = [0u8; 1];
    let mut iov = [IoSliceMut::new(&mut payload)];
    let mut cmsg_buffer = nix::cmsg_space!([RawFd; 1]);
    let msg = recvmsg::<()>(
        sock,
        &mut iov,
        Some(&mut cmsg_buffer),
        MsgFlags::empty(),
    )?;

    for cmsg in msg.cmsgs()? {
        if let ControlMessageOwned::ScmRights(fds) = cmsg {
            if let Some(&fd) = fds.first() {
                // Safety: the kernel duplicated this descriptor for us as
                // part of the SCM_RIGHTS transfer; we own it from here.
                return Ok(unsafe { OwnedFd::from_raw_fd(fd) });
            }
        }
    }
    Err(nix::errno::Errno::ENOMSG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};

    #[test]
    fn notify_then_drain_round_trips() {
        let counter = WakeCounter::new().unwrap();
        counter.notify().unwrap();
        counter.notify().unwrap();
        assert_eq!(counter.drain().unwrap(), 2);
    }

    #[test]
    fn try_drain_is_none_until_notified() {
        let counter = WakeCounter::new().unwrap();
        assert_eq!(counter.try_drain().unwrap(), None);
        counter.notify().unwrap();
        assert_eq!(counter.try_drain().unwrap(), Some(1));
        assert_eq!(counter.try_drain().unwrap(), None);
    }

    #[test]
    fn wake_handle_survives_scm_rights_transfer() {
        let (a, b) = socketpair(
            AddressFamily::Unix,
            SockType::Stream,
            None,
            SockFlag::empty(),
        )
        .unwrap();

        let counter = WakeCounter::new().unwrap();
        send_wake_handle(a.as_raw_fd(), counter.as_fd()).unwrap();

        let received = recv_wake_handle(b.as_raw_fd()).unwrap();
        counter.notify().unwrap();

        let mut buf = [0u8; 8];
        nix::unistd::read(received.as_raw_fd(), &mut buf).unwrap();
        assert_eq!(u64::from_ne_bytes(buf), 1);
    }
}
