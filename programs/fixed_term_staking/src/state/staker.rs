use anchor_lang::prelude::*;

/// Per-wallet counter that hands out stable position indices.
#[account]
pub struct StakerAccount {
    pub owner: Pubkey,
    /// Positions opened so far; also the index of the next one.
    pub position_count: u64,
    pub bump: u8,
}

impl StakerAccount {
    pub const LEN: usize = 8 + 32 + 8 + 1;

    pub fn next_index(&self) -> u64 {
        self.position_count
    }
}
