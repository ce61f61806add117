#![no_std]

/*
    =======================  support/arena/src/lib.rs  ========================
    Typed-index arenas for declaration trees and subobject graphs
    ---------------------------------------------------------------------------
*/

mod arena;
mod id;
mod idx;
mod new_id;

extern crate alloc;

pub use arena::Arena;
pub use id::Id;
pub use idx::Idx;
