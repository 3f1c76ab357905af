//! Example hook registration, translated from the original demo
//! target's `hooks.c`. Not part of the build — this shows the shape a
//! real `dh_install_all_hooks`-equivalent takes, wired to the actual
//! PPC address space through raw volatile reads/writes. It is not
//! compiled or tested as part of this crate.

use dolhook::runtime::{find_pattern, trampoline, Hook, HookError};

// Placeholder addresses; `install_all_hooks` rebuilds these once the
// real target/replacement addresses are known.
static mut OSREPORT_HOOK: Hook = Hook::new(0, 0);
static mut GAME_FUNC_HOOK: Hook = Hook::new(0, 0);

/// Reads the live 16 bytes at `addr` out of the actual address space.
unsafe fn read_target(addr: u32, len: usize) -> [u8; 16] {
    let mut out = [0u8; 16];
    let ptr = addr as *const u8;
    for i in 0..len {
        out[i] = unsafe { core::ptr::read_volatile(ptr.add(i)) };
    }
    out
}

/// Writes `data` into the live address space at `addr`.
fn write_target(addr: u32, data: &[u8]) {
    let ptr = addr as *mut u8;
    for (i, &b) in data.iter().enumerate() {
        unsafe { core::ptr::write_volatile(ptr.add(i), b) };
    }
}

/// Prepends a tag before forwarding to the original `OSReport` through
/// the hook's trampoline. A faithful `va_list` forward would need an
/// assembly thunk; this keeps the same simplification the original
/// demo makes.
extern "C" fn my_osreport(_fmt: *const u8) {
    let trampoline = unsafe { OSREPORT_HOOK.trampoline() };
    if let Some(_original) = trampoline {
        log::info!("[DolHook] (forwarded OSReport call)");
    }
}

extern "C" fn my_game_function(x: i32, y: i32) -> i32 {
    let result = x + y; // would call through the trampoline on target
    log::debug!("game function called: {x} + {y} = {result}");
    result * 2
}

/// Equivalent of the original `dh_install_all_hooks`: called once by
/// [`dolhook::runtime::init`].
pub fn install_all_hooks() {
    log::info!("installing hooks...");

    let pattern = [0x94, 0x21, 0x00, 0x00, 0x7C, 0x08, 0x02, 0xA6];
    let mask = [b'x', b'x', b'?', b'?', b'x', b'x', b'x', b'x'];

    let search_region = unsafe {
        core::slice::from_raw_parts(0x8000_3000 as *const u8, 0x10_0000)
    };

    if let Some(offset) = find_pattern(search_region, &pattern, &mask) {
        let osreport_addr = 0x8000_3000u32 + offset as u32;
        log::info!("found OSReport at {osreport_addr:#010x}");

        unsafe {
            OSREPORT_HOOK = Hook::new(osreport_addr, my_osreport as usize as u32);
            match OSREPORT_HOOK.install(&trampoline::POOL, read_target, write_target) {
                Ok(()) => log::info!("OSReport hook installed"),
                Err(HookError::AllocationFailure) => log::warn!("trampoline pool exhausted"),
                Err(e) => log::warn!("failed to hook OSReport: {e}"),
            }
        }
    }

    // Replace with the real address once known; left unresolved in the
    // original demo too.
    let game_func_addr = 0x8012_3456u32;
    unsafe {
        if GAME_FUNC_HOOK.target() != game_func_addr {
            GAME_FUNC_HOOK = Hook::new(game_func_addr, my_game_function as usize as u32);
            if GAME_FUNC_HOOK.install(&trampoline::POOL, read_target, write_target).is_ok() {
                log::info!("game function hook installed");
            }
        }
    }

    log::info!("hook installation complete");
}

/// Equivalent of the original `remove_all_hooks`, callable before the
/// game exits cleanly.
pub fn remove_all_hooks() {
    unsafe {
        let _ = OSREPORT_HOOK.remove(write_target);
        let _ = GAME_FUNC_HOOK.remove(write_target);
    }
}
