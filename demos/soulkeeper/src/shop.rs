use crate::board::{Level, TileKind};

pub const STARTING_SOULSTONES: u32 = 100;
pub const REMOVE_COST: u32 = 3;
/// Graves needed before ghosts can be bought.
pub const GHOSTS_UNLOCK_AT: usize = 8;
/// Trees needed before bats can be bought.
pub const BATS_UNLOCK_AT: usize = 12;

/// A shop button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopItem {
    Soulflower,
    Remove,
    Tree,
    Bat,
    Ghost,
    Tombstone,
    Grave,
}

impl ShopItem {
    /// Decode the page's button code.
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => ShopItem::Soulflower,
            1 => ShopItem::Remove,
            2 => ShopItem::Tree,
            3 => ShopItem::Bat,
            4 => ShopItem::Ghost,
            5 => ShopItem::Tombstone,
            6 => ShopItem::Grave,
            _ => return None,
        })
    }

    /// What a fresh purchase puts on the board. `None` for the remove tool.
    pub fn builds(self) -> Option<TileKind> {
        match self {
            ShopItem::Soulflower => Some(TileKind::Soulflower),
            ShopItem::Remove => None,
            ShopItem::Tree => Some(TileKind::Tree),
            ShopItem::Bat => Some(TileKind::Bat),
            ShopItem::Ghost => Some(TileKind::Ghost),
            ShopItem::Tombstone => Some(TileKind::Tombstone(Level::One)),
            ShopItem::Grave => Some(TileKind::Grave(Level::One)),
        }
    }
}

/// Soulstone price of building (or upgrading to) `kind`.
pub fn cost(kind: TileKind) -> Option<u32> {
    Some(match kind {
        TileKind::Soulflower => 5,
        TileKind::Tree => 10,
        TileKind::Bat => 30,
        TileKind::Ghost => 75,
        TileKind::Tombstone(Level::One) => 20,
        TileKind::Tombstone(Level::Two) => 30,
        TileKind::Tombstone(Level::Three) => 40,
        TileKind::Grave(Level::One) => 15,
        TileKind::Grave(Level::Two) => 25,
        TileKind::Grave(Level::Three) => 35,
        TileKind::Path | TileKind::Fence | TileKind::Empty | TileKind::Flower => return None,
    })
}

/// The player's soulstone purse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Purse {
    soulstones: u32,
}

impl Purse {
    pub fn new(soulstones: u32) -> Self {
        Self { soulstones }
    }

    pub fn balance(&self) -> u32 {
        self.soulstones
    }

    /// Pay `amount`. Fails without touching the balance when it would go negative.
    pub fn spend(&mut self, amount: u32) -> bool {
        match self.soulstones.checked_sub(amount) {
            Some(rest) => {
                self.soulstones = rest;
                true
            }
            None => false,
        }
    }

    pub fn earn(&mut self, amount: u32) {
        self.soulstones = self.soulstones.saturating_add(amount);
    }
}

impl Default for Purse {
    fn default() -> Self {
        Self::new(STARTING_SOULSTONES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_follow_the_shop_board() {
        assert_eq!(cost(TileKind::Soulflower), Some(5));
        assert_eq!(cost(TileKind::Ghost), Some(75));
        assert_eq!(cost(TileKind::Tombstone(Level::Two)), Some(30));
        assert_eq!(cost(TileKind::Grave(Level::Three)), Some(35));
        assert_eq!(cost(TileKind::Flower), None);
    }

    #[test]
    fn purse_refuses_overdraft() {
        let mut purse = Purse::default();
        assert!(purse.spend(75));
        assert!(!purse.spend(30));
        assert_eq!(purse.balance(), 25);
        purse.earn(5);
        assert!(purse.spend(30));
        assert_eq!(purse.balance(), 0);
    }

    #[test]
    fn shop_codes_round_trip_to_builds() {
        assert_eq!(ShopItem::from_code(1), Some(ShopItem::Remove));
        assert_eq!(ShopItem::Remove.builds(), None);
        assert_eq!(ShopItem::from_code(5).and_then(ShopItem::builds), Some(TileKind::Tombstone(Level::One)));
        assert_eq!(ShopItem::from_code(9), None);
    }
}
