//! Inline function hooking: detour a target function to a replacement,
//! preserving a trampoline that calls the stolen prologue.
//!
//! Ported from `dh_hook_install` / `dh_hook_remove` and the `dh_hook`
//! descriptor.

use core::fmt;

use crate::runtime::branch;
use crate::runtime::cache;
use crate::runtime::trampoline::{self, TrampolinePool};

/// Bytes saved from the target's original prologue, sized for the
/// worst case (absolute branch, 16 bytes).
const SAVED_LEN: usize = 16;

/// Failure modes for hook installation and removal. Kept separate from
/// [`crate::error::Error`]: this module must stay usable without an
/// allocator in the inner hook-install path, so codes are small and
/// `Copy`, not boxed strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookError {
    /// `target` or `replacement` was the null address.
    NullPointer,
    /// The trampoline pool has no room left for this hook.
    AllocationFailure,
    /// Reserved for a prologue-safety check (PC-relative branches in
    /// the stolen bytes) that the engine documents as a caller
    /// obligation but does not currently perform.
    Unsafe,
    /// [`Hook::remove`] was called on a hook that was never installed.
    NotInstalled,
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookError::NullPointer => write!(f, "target or replacement address is null"),
            HookError::AllocationFailure => write!(f, "trampoline pool exhausted"),
            HookError::Unsafe => write!(f, "target prologue failed a safety check"),
            HookError::NotInstalled => write!(f, "hook was never installed"),
        }
    }
}

/// A function hook descriptor. Mirrors the original `dh_hook` struct:
/// construct with [`Hook::new`], then [`Hook::install`] before the
/// target address is ever called, and optionally [`Hook::remove`] to
/// undo it.
pub struct Hook {
    target: u32,
    replacement: u32,
    trampoline: Option<u32>,
    saved: [u8; SAVED_LEN],
    patch_len: usize,
}

impl Hook {
    /// Create an uninstalled hook descriptor.
    pub const fn new(target: u32, replacement: u32) -> Self {
        Hook {
            target,
            replacement,
            trampoline: None,
            saved: [0u8; SAVED_LEN],
            patch_len: 0,
        }
    }

    /// Address of the original function this hook detours.
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Address of the trampoline that calls the stolen prologue,
    /// available once [`Hook::install`] has succeeded.
    pub fn trampoline(&self) -> Option<u32> {
        self.trampoline
    }

    /// Install the hook: steal the target's prologue into a
    /// trampoline, then overwrite the prologue with a branch to
    /// `replacement`.
    ///
    /// `read_target`/`write_target` abstract over reading the live
    /// memory at `target` and writing the patch back, so the bump
    /// allocator and branch-choice logic can be exercised without a
    /// real PPC address space; on target these close over raw pointer
    /// reads/writes into `self.target`.
    ///
    /// # Safety
    /// The first 16 bytes at `target` must be safe to overwrite and
    /// must not contain a PC-relative branch whose source moves
    /// (the engine does not verify this; see [`HookError::Unsafe`]).
    pub unsafe fn install(
        &mut self,
        pool: &TrampolinePool,
        read_target: impl Fn(u32, usize) -> [u8; SAVED_LEN],
        mut write_target: impl FnMut(u32, &[u8]),
    ) -> Result<(), HookError> {
        if self.target == 0 || self.replacement == 0 {
            return Err(HookError::NullPointer);
        }

        let use_near = branch::encode_branch_imm(self.target, self.replacement, false).is_some();
        let patch_len = if use_near { 4 } else { branch::ABS_BRANCH_LEN };

        self.saved = read_target(self.target, SAVED_LEN);
        self.patch_len = patch_len;

        let stolen = &self.saved[..patch_len];
        let return_addr = self.target.wrapping_add(patch_len as u32);
        let trampoline_addr = unsafe { pool.alloc(stolen, return_addr) }
            .ok_or(HookError::AllocationFailure)?;
        self.trampoline = Some(trampoline_addr);

        cache::with_interrupts_masked(|| {
            if use_near {
                let insn = branch::encode_branch_imm(self.target, self.replacement, false)
                    .expect("checked above");
                write_target(self.target, &insn.to_be_bytes());
            } else {
                let seq = branch::encode_branch_abs(self.replacement, false);
                let mut bytes = [0u8; branch::ABS_BRANCH_LEN];
                for (i, insn) in seq.iter().enumerate() {
                    bytes[i * 4..i * 4 + 4].copy_from_slice(&insn.to_be_bytes());
                }
                write_target(self.target, &bytes);
            }
            cache::icache_sync_range(self.target, patch_len as u32);
        });

        Ok(())
    }

    /// Restore the original bytes at `target`. The trampoline itself
    /// is not reclaimed (the pool has no free list).
    ///
    /// # Safety
    /// Same memory-access obligations as [`Hook::install`].
    pub unsafe fn remove(&mut self, mut write_target: impl FnMut(u32, &[u8])) -> Result<(), HookError> {
        if self.trampoline.is_none() {
            return Err(HookError::NotInstalled);
        }
        cache::with_interrupts_masked(|| {
            write_target(self.target, &self.saved[..self.patch_len]);
            cache::icache_sync_range(self.target, self.patch_len as u32);
        });
        self.trampoline = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;

    use super::*;
    use core::cell::RefCell;

    /// A tiny in-memory stand-in for target address space, so hook
    /// install/remove can be exercised without real PPC memory.
    struct FakeMemory {
        bytes: RefCell<alloc::vec::Vec<u8>>,
        base: u32,
    }

    impl FakeMemory {
        fn new(base: u32, len: usize) -> Self {
            FakeMemory { bytes: RefCell::new(alloc::vec![0u8; len]), base }
        }

        fn read16(&self, addr: u32) -> [u8; SAVED_LEN] {
            let off = (addr - self.base) as usize;
            let mut out = [0u8; SAVED_LEN];
            out.copy_from_slice(&self.bytes.borrow()[off..off + SAVED_LEN]);
            out
        }

        fn write(&self, addr: u32, data: &[u8]) {
            let off = (addr - self.base) as usize;
            self.bytes.borrow_mut()[off..off + data.len()].copy_from_slice(data);
        }
    }

    #[test]
    fn install_writes_near_branch_and_builds_trampoline() {
        let pool = TrampolinePool::new();
        let mem = FakeMemory::new(0x8000_0000, 0x100);
        let mut hook = Hook::new(0x8000_0000, 0x8000_0400);

        let result = unsafe {
            hook.install(
                &pool,
                |addr, _| mem.read16(addr),
                |addr, data| mem.write(addr, data),
            )
        };
        assert!(result.is_ok());
        assert!(hook.trampoline().is_some());

        let patched = mem.read16(0x8000_0000);
        let insn = u32::from_be_bytes([patched[0], patched[1], patched[2], patched[3]]);
        let (target, _) = branch::decode_branch_imm(insn, 0x8000_0000).unwrap();
        assert_eq!(target, 0x8000_0400);
    }

    #[test]
    fn remove_restores_original_bytes() {
        let pool = TrampolinePool::new();
        let mem = FakeMemory::new(0x8000_0000, 0x100);
        mem.write(0x8000_0000, &[0x60, 0x00, 0x00, 0x00]); // nop-ish original bytes

        let mut hook = Hook::new(0x8000_0000, 0x8000_0400);
        unsafe {
            hook.install(&pool, |addr, _| mem.read16(addr), |addr, data| mem.write(addr, data)).unwrap();
            hook.remove(|addr, data| mem.write(addr, data)).unwrap();
        }

        let restored = mem.read16(0x8000_0000);
        assert_eq!(&restored[..4], &[0x60, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn null_target_is_rejected() {
        let pool = TrampolinePool::new();
        let mut hook = Hook::new(0, 0x8000_0400);
        let result = unsafe { hook.install(&pool, |_, _| [0u8; SAVED_LEN], |_, _| {}) };
        assert_eq!(result, Err(HookError::NullPointer));
    }

    #[test]
    fn remove_without_install_is_an_error() {
        let mut hook = Hook::new(0x8000_0000, 0x8000_0400);
        let result = unsafe { hook.remove(|_, _| {}) };
        assert_eq!(result, Err(HookError::NotInstalled));
    }

    #[test]
    fn allocation_failure_propagates() {
        let pool = TrampolinePool::new();
        // Exhaust the pool first.
        unsafe {
            let _ = pool.alloc(&[0u8; trampoline::POOL_SIZE - 32], 0x8000_0000);
        }
        let mem = FakeMemory::new(0x8000_0000, 0x100);
        let mut hook = Hook::new(0x8000_0000, 0x8000_0400);
        let result = unsafe {
            hook.install(&pool, |addr, _| mem.read16(addr), |addr, data| mem.write(addr, data))
        };
        assert_eq!(result, Err(HookError::AllocationFailure));
    }
}
