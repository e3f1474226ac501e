// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named process-shared car state.
//!
//! Each car owns a POSIX shared-memory object named `/car<name>` holding its
//! live record: door status, current and destination floors, and seven
//! single-byte flags, all guarded by a process-shared mutex with a condition
//! variable broadcast on every change. The safety monitor and the internal
//! command tool open the same object read-write from their own processes.
//!
//! Floors and the status are stored as NUL-terminated byte tokens rather
//! than parsed values so that observers (the safety monitor in particular)
//! can see and judge whatever is actually in the record.

use std::mem::size_of;
use std::num::NonZeroUsize;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use nix::fcntl::OFlag;
use nix::libc;
use nix::sys::mman::{mmap, munmap, shm_open, shm_unlink, MapFlags, ProtFlags};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;
use tracing::{debug, warn};

use crate::error::ErrorKind;
use crate::floor::Floor;
use crate::state::DoorState;

/// Prefix of every car's shared object name.
pub const NAME_PREFIX: &str = "/car";

/// Longest accepted object name, prefix included.
const MAX_OBJECT_NAME: usize = 255;

const FLOOR_BYTES: usize = 4;
const STATUS_BYTES: usize = 8;

/// The mapped record. Field order matches the wire-visible description:
/// sync primitives first, then the two floor tokens, the status token and
/// the flag bytes.
#[repr(C)]
struct SharedBlock {
    mutex: libc::pthread_mutex_t,
    cond: libc::pthread_cond_t,
    fields: SharedFields,
}

#[repr(C)]
struct SharedFields {
    current_floor: [u8; FLOOR_BYTES],
    destination_floor: [u8; FLOOR_BYTES],
    status: [u8; STATUS_BYTES],
    open_button: u8,
    close_button: u8,
    door_obstruction: u8,
    overload: u8,
    emergency_stop: u8,
    individual_service_mode: u8,
    emergency_mode: u8,
}

/// The seven single-byte flags of a car record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    OpenButton,
    CloseButton,
    DoorObstruction,
    Overload,
    EmergencyStop,
    IndividualService,
    EmergencyMode,
}

impl Flag {
    pub const ALL: [Flag; 7] = [
        Flag::OpenButton,
        Flag::CloseButton,
        Flag::DoorObstruction,
        Flag::Overload,
        Flag::EmergencyStop,
        Flag::IndividualService,
        Flag::EmergencyMode,
    ];
}

/// Build the shared object name for a car, enforcing the length cap.
pub fn object_name(car_name: &str) -> Result<String, ErrorKind> {
    if car_name.is_empty() {
        return Err(ErrorKind::BadArgument);
    }
    let name = format!("{NAME_PREFIX}{car_name}");
    if name.len() >= MAX_OBJECT_NAME {
        return Err(ErrorKind::BadArgument);
    }
    Ok(name)
}

/// Handle on a car's shared state object.
///
/// The creating car process gets the owning handle, which tears the object
/// down again on drop; the safety monitor and command tool attach with
/// non-owning handles.
pub struct CarShared {
    ptr: NonNull<SharedBlock>,
    object_name: String,
    owner: bool,
    unlinked: AtomicBool,
}

// SAFETY: every access to the mapping goes through the embedded
// process-shared mutex via `lock`; the handle itself is just a pointer to
// the mapping plus metadata.
#[allow(unsafe_code)]
unsafe impl Send for CarShared {}
#[allow(unsafe_code)]
unsafe impl Sync for CarShared {}

impl CarShared {
    /// Create and initialise the object for `car_name`, with both floors at
    /// `init_floor`, status `Closed` and all flags cleared.
    #[allow(unsafe_code)]
    pub fn create(car_name: &str, init_floor: Floor) -> Result<Self, ErrorKind> {
        let object_name = object_name(car_name)?;
        let ptr = map_object(&object_name, true)?;

        // SAFETY: the mapping was just created with the record's size; the
        // attribute structs live only for the init calls.
        unsafe {
            let block = ptr.as_ptr();

            let mut mutex_attr: libc::pthread_mutexattr_t = std::mem::zeroed();
            libc::pthread_mutexattr_init(&mut mutex_attr);
            libc::pthread_mutexattr_setpshared(&mut mutex_attr, libc::PTHREAD_PROCESS_SHARED);
            libc::pthread_mutex_init(&mut (*block).mutex, &mutex_attr);
            libc::pthread_mutexattr_destroy(&mut mutex_attr);

            let mut cond_attr: libc::pthread_condattr_t = std::mem::zeroed();
            libc::pthread_condattr_init(&mut cond_attr);
            libc::pthread_condattr_setpshared(&mut cond_attr, libc::PTHREAD_PROCESS_SHARED);
            libc::pthread_cond_init(&mut (*block).cond, &cond_attr);
            libc::pthread_condattr_destroy(&mut cond_attr);
        }

        let state = Self { ptr, object_name, owner: true, unlinked: AtomicBool::new(false) };
        {
            let mut guard = state.lock();
            guard.set_current_floor(init_floor);
            guard.set_destination_floor(init_floor);
            guard.set_door(DoorState::Closed);
            for flag in Flag::ALL {
                guard.set_flag(flag, false);
            }
        }
        Ok(state)
    }

    /// Attach to an existing object. Fails with `ShmUnavailable` when no car
    /// of that name is running.
    pub fn open(car_name: &str) -> Result<Self, ErrorKind> {
        let object_name = object_name(car_name)?;
        let ptr = map_object(&object_name, false)?;
        Ok(Self { ptr, object_name, owner: false, unlinked: AtomicBool::new(false) })
    }

    /// Acquire the record's mutex, returning a guard that releases it on all
    /// exit paths.
    #[allow(unsafe_code)]
    pub fn lock(&self) -> StateGuard<'_> {
        // SAFETY: the mutex was initialised process-shared by the creating
        // car and lives as long as the mapping.
        let rc = unsafe { libc::pthread_mutex_lock(&mut (*self.ptr.as_ptr()).mutex) };
        if rc != 0 {
            warn!(rc, object = %self.object_name, "pthread_mutex_lock failed");
        }
        StateGuard { shm: self }
    }

    /// Remove the object's name so no further process can attach. Safe to
    /// call more than once; existing mappings stay usable.
    pub fn unlink(&self) {
        if self.unlinked.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = shm_unlink(self.object_name.as_str()) {
            debug!(object = %self.object_name, "shm_unlink failed: {e}");
        }
    }
}

impl Drop for CarShared {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        // SAFETY: the owner created the primitives and is the last writer of
        // record lifecycle; every handle unmaps only its own mapping.
        unsafe {
            let block = self.ptr.as_ptr();
            if self.owner {
                libc::pthread_mutex_destroy(&mut (*block).mutex);
                libc::pthread_cond_destroy(&mut (*block).cond);
            }
            if let Err(e) = munmap(self.ptr.cast(), size_of::<SharedBlock>()) {
                warn!(object = %self.object_name, "munmap failed: {e}");
            }
        }
        if self.owner {
            self.unlink();
        }
    }
}

#[allow(unsafe_code)]
fn map_object(name: &str, create: bool) -> Result<NonNull<SharedBlock>, ErrorKind> {
    let oflag = if create { OFlag::O_CREAT | OFlag::O_RDWR } else { OFlag::O_RDWR };
    let fd = shm_open(name, oflag, Mode::from_bits_truncate(0o666)).map_err(|e| {
        debug!(object = name, "shm_open failed: {e}");
        ErrorKind::ShmUnavailable
    })?;
    if create {
        ftruncate(&fd, size_of::<SharedBlock>() as libc::off_t).map_err(|e| {
            warn!(object = name, "ftruncate failed: {e}");
            ErrorKind::ShmUnavailable
        })?;
    }
    let len = NonZeroUsize::new(size_of::<SharedBlock>()).ok_or(ErrorKind::ShmUnavailable)?;
    // SAFETY: a fresh MAP_SHARED mapping of the record's size; the fd may be
    // closed right after per POSIX, the mapping stays valid until munmap.
    let ptr = unsafe {
        mmap(None, len, ProtFlags::PROT_READ | ProtFlags::PROT_WRITE, MapFlags::MAP_SHARED, &fd, 0)
    }
    .map_err(|e| {
        warn!(object = name, "mmap failed: {e}");
        ErrorKind::ShmUnavailable
    })?;
    Ok(ptr.cast())
}

/// An absolute deadline for timed condition waits, on the clock
/// `pthread_cond_timedwait` uses by default.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(libc::timespec);

impl Deadline {
    #[allow(unsafe_code)]
    pub fn from_now(delay: Duration) -> Self {
        let mut now = libc::timespec { tv_sec: 0, tv_nsec: 0 };
        // SAFETY: plain out-parameter read of CLOCK_REALTIME.
        unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut now) };
        let nanos = now.tv_nsec + delay.subsec_nanos() as libc::c_long;
        Self(libc::timespec {
            tv_sec: now.tv_sec
                + delay.as_secs() as libc::time_t
                + (nanos / 1_000_000_000) as libc::time_t,
            tv_nsec: nanos % 1_000_000_000,
        })
    }
}

/// Exclusive view of a car record while its mutex is held.
pub struct StateGuard<'a> {
    shm: &'a CarShared,
}

impl StateGuard<'_> {
    #[allow(unsafe_code)]
    fn fields(&self) -> &SharedFields {
        // SAFETY: the guard holds the record mutex for its whole lifetime.
        unsafe { &(*self.shm.ptr.as_ptr()).fields }
    }

    #[allow(unsafe_code)]
    fn fields_mut(&mut self) -> &mut SharedFields {
        // SAFETY: as above; the mutex gives exclusive access.
        unsafe { &mut (*self.shm.ptr.as_ptr()).fields }
    }

    pub fn current_floor(&self) -> Option<Floor> {
        parse_floor(&self.fields().current_floor)
    }

    pub fn set_current_floor(&mut self, floor: Floor) {
        write_token(&mut self.fields_mut().current_floor, &floor.to_string());
    }

    pub fn destination_floor(&self) -> Option<Floor> {
        parse_floor(&self.fields().destination_floor)
    }

    pub fn set_destination_floor(&mut self, floor: Floor) {
        write_token(&mut self.fields_mut().destination_floor, &floor.to_string());
    }

    pub fn door(&self) -> Option<DoorState> {
        std::str::from_utf8(token(&self.fields().status)).ok()?.parse().ok()
    }

    pub fn set_door(&mut self, door: DoorState) {
        write_token(&mut self.fields_mut().status, door.as_str());
    }

    /// Raw status token for observers that must judge invalid contents.
    pub fn status_token(&self) -> &[u8] {
        token(&self.fields().status)
    }

    pub fn current_token(&self) -> &[u8] {
        token(&self.fields().current_floor)
    }

    pub fn destination_token(&self) -> &[u8] {
        token(&self.fields().destination_floor)
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.flag_raw(flag) == 1
    }

    /// Raw flag byte; anything other than 0 or 1 is a consistency violation.
    pub fn flag_raw(&self, flag: Flag) -> u8 {
        let f = self.fields();
        match flag {
            Flag::OpenButton => f.open_button,
            Flag::CloseButton => f.close_button,
            Flag::DoorObstruction => f.door_obstruction,
            Flag::Overload => f.overload,
            Flag::EmergencyStop => f.emergency_stop,
            Flag::IndividualService => f.individual_service_mode,
            Flag::EmergencyMode => f.emergency_mode,
        }
    }

    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        let f = self.fields_mut();
        let byte = match flag {
            Flag::OpenButton => &mut f.open_button,
            Flag::CloseButton => &mut f.close_button,
            Flag::DoorObstruction => &mut f.door_obstruction,
            Flag::Overload => &mut f.overload,
            Flag::EmergencyStop => &mut f.emergency_stop,
            Flag::IndividualService => &mut f.individual_service_mode,
            Flag::EmergencyMode => &mut f.emergency_mode,
        };
        *byte = u8::from(value);
    }

    /// The three wire-visible fields, when they all parse.
    pub fn snapshot(&self) -> Option<(DoorState, Floor, Floor)> {
        Some((self.door()?, self.current_floor()?, self.destination_floor()?))
    }

    /// Wake every waiter on the record. Writers call this after mutating.
    #[allow(unsafe_code)]
    pub fn broadcast(&mut self) {
        // SAFETY: cond and mutex belong to the held record.
        let rc = unsafe { libc::pthread_cond_broadcast(&mut (*self.shm.ptr.as_ptr()).cond) };
        if rc != 0 {
            warn!(rc, "pthread_cond_broadcast failed");
        }
    }

    /// Block until the record changes. Releases the mutex while waiting.
    #[allow(unsafe_code)]
    pub fn wait(&mut self) {
        let block = self.shm.ptr.as_ptr();
        // SAFETY: cond and mutex belong to the held record.
        let rc = unsafe { libc::pthread_cond_wait(&mut (*block).cond, &mut (*block).mutex) };
        if rc != 0 {
            warn!(rc, "pthread_cond_wait failed");
        }
    }

    /// Block until the record changes or the deadline passes. Returns true
    /// when woken by a broadcast, false on timeout.
    #[allow(unsafe_code)]
    pub fn wait_until(&mut self, deadline: &Deadline) -> bool {
        let block = self.shm.ptr.as_ptr();
        // SAFETY: cond and mutex belong to the held record.
        let rc = unsafe {
            libc::pthread_cond_timedwait(&mut (*block).cond, &mut (*block).mutex, &deadline.0)
        };
        match rc {
            0 => true,
            libc::ETIMEDOUT => false,
            _ => {
                warn!(rc, "pthread_cond_timedwait failed");
                false
            }
        }
    }
}

impl Drop for StateGuard<'_> {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        // SAFETY: the guard acquired this mutex in `lock`.
        let rc = unsafe { libc::pthread_mutex_unlock(&mut (*self.shm.ptr.as_ptr()).mutex) };
        if rc != 0 {
            warn!(rc, "pthread_mutex_unlock failed");
        }
    }
}

fn token(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(n) => &bytes[..n],
        None => bytes,
    }
}

fn parse_floor(bytes: &[u8]) -> Option<Floor> {
    std::str::from_utf8(token(bytes)).ok()?.parse().ok()
}

fn write_token(dest: &mut [u8], value: &str) {
    dest.fill(0);
    dest[..value.len()].copy_from_slice(value.as_bytes());
}

#[cfg(test)]
#[path = "shm_tests.rs"]
mod tests;
