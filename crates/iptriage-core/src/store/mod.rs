// # Membership Store Implementations
//
// In-process implementations of the MembershipStore trait. Network-backed
// stores live in their own crates.

pub mod memory;

pub use memory::MemoryMembershipStore;
