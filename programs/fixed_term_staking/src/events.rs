use anchor_lang::prelude::*;

#[event]
pub struct Staked {
    pub owner: Pubkey,
    pub position_index: u64,
    pub plan_id: u8,
    pub principal: u64,
    pub bonus: u64,
    pub unlock: i64,
}

#[event]
pub struct Withdrawn {
    pub owner: Pubkey,
    pub position_index: u64,
    pub payout: u64,
}

#[event]
pub struct EmergencyWithdrawn {
    pub owner: Pubkey,
    pub position_index: u64,
    pub payout: u64,
    pub forfeited_bonus: u64,
}

#[event]
pub struct RewardsFunded {
    pub funder: Pubkey,
    pub amount: u64,
    pub rewards_pool: u64,
}

#[event]
pub struct PauseChanged {
    pub authority: Pubkey,
    pub paused: bool,
}

#[event]
pub struct AuthorityTransferred {
    pub previous_authority: Pubkey,
    pub new_authority: Pubkey,
}
