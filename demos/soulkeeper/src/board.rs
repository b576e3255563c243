use haunt_engine::{Rng, TimerId};

pub const COLUMNS: usize = 30;
pub const ROWS: usize = 20;
pub const TILE_SIZE: f32 = 16.0;

const TURN_EVERY_COLUMNS: usize = 5;
const MIN_TURN_LENGTH: i32 = 3;

/// Upgrade level of tombstones and graves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    One = 1,
    Two = 2,
    Three = 3,
}

impl Level {
    pub fn next(self) -> Option<Level> {
        match self {
            Level::One => Some(Level::Two),
            Level::Two => Some(Level::Three),
            Level::Three => None,
        }
    }
}

/// What occupies a board square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Path,
    Fence,
    /// Free and buildable.
    Empty,
    Flower,
    Soulflower,
    Tree,
    Bat,
    Ghost,
    Tombstone(Level),
    Grave(Level),
}

impl TileKind {
    /// Anything the player (or the garden) put there.
    pub fn is_built(self) -> bool {
        !matches!(self, TileKind::Path | TileKind::Fence | TileKind::Empty)
    }

    /// Contribution to the scaryometer.
    pub fn scariness(self) -> i32 {
        match self {
            TileKind::Flower | TileKind::Soulflower => -1,
            TileKind::Tree => 2,
            TileKind::Tombstone(Level::One) => 1,
            TileKind::Tombstone(Level::Two) => 3,
            TileKind::Tombstone(Level::Three) => 6,
            TileKind::Grave(Level::One) => 2,
            TileKind::Grave(Level::Two) => 5,
            TileKind::Grave(Level::Three) => 9,
            TileKind::Ghost => 10,
            TileKind::Bat => 5,
            TileKind::Path | TileKind::Fence | TileKind::Empty => 0,
        }
    }

    /// Numeric code sent to the page.
    pub fn code(self) -> u8 {
        match self {
            TileKind::Path => 0,
            TileKind::Fence => 1,
            TileKind::Empty => 2,
            TileKind::Flower => 3,
            TileKind::Soulflower => 4,
            TileKind::Tree => 5,
            TileKind::Bat => 6,
            TileKind::Ghost => 7,
            TileKind::Tombstone(_) => 8,
            TileKind::Grave(_) => 9,
        }
    }

    pub fn level(self) -> Option<Level> {
        match self {
            TileKind::Tombstone(level) | TileKind::Grave(level) => Some(level),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub kind: TileKind,
    pub upgradable: bool,
    /// Pending "becomes upgradable" timer on the game clock.
    pub upgrade_timer: Option<TimerId>,
}

impl Tile {
    fn new(kind: TileKind) -> Self {
        Self {
            kind,
            upgradable: false,
            upgrade_timer: None,
        }
    }
}

/// The 30×20 garden: tiles plus the waypoints characters walk.
#[derive(Debug, Clone)]
pub struct Board {
    tiles: Vec<Tile>,
    /// Turn points in tile coordinates, including the off-board entry and exit.
    waypoints: Vec<(i32, i32)>,
}

impl Board {
    /// Generate a fresh board: a winding path, a fence around the edge, and a
    /// sprinkle of flowers.
    pub fn generate(rng: &mut Rng) -> Self {
        let (path, waypoints) = generate_path(rng, COLUMNS, ROWS);

        let mut tiles = Vec::with_capacity(COLUMNS * ROWS);
        for row in 0..ROWS {
            for col in 0..COLUMNS {
                let on_edge = row == 0 || row == ROWS - 1 || col == 0 || col == COLUMNS - 1;
                let kind = if path.contains(&(col, row)) {
                    TileKind::Path
                } else if on_edge {
                    TileKind::Fence
                } else if rng.random(0, 100) <= 3 {
                    if rng.random(0, 100) <= 33 {
                        TileKind::Soulflower
                    } else {
                        TileKind::Flower
                    }
                } else {
                    TileKind::Empty
                };
                tiles.push(Tile::new(kind));
            }
        }

        Self { tiles, waypoints }
    }

    /// A board from explicit kinds, row-major.
    #[cfg(test)]
    pub fn from_kinds(kinds: Vec<TileKind>, waypoints: Vec<(i32, i32)>) -> Self {
        Self {
            tiles: kinds.into_iter().map(Tile::new).collect(),
            waypoints,
        }
    }

    pub fn waypoints(&self) -> &[(i32, i32)] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn tile(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    pub fn tile_mut(&mut self, index: usize) -> Option<&mut Tile> {
        self.tiles.get_mut(index)
    }

    pub fn kind(&self, index: usize) -> Option<TileKind> {
        self.tiles.get(index).map(|t| t.kind)
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Replace a tile's content. Returns the pending upgrade timer the caller
    /// must cancel.
    pub fn set_kind(&mut self, index: usize, kind: TileKind) -> Option<TimerId> {
        let tile = self.tiles.get_mut(index)?;
        tile.kind = kind;
        tile.upgradable = false;
        tile.upgrade_timer.take()
    }

    /// Tile index under a world position.
    pub fn index_at(&self, x: f32, y: f32) -> Option<usize> {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let col = (x / TILE_SIZE) as usize;
        let row = (y / TILE_SIZE) as usize;
        (col < COLUMNS && row < ROWS).then_some(row * COLUMNS + col)
    }

    pub fn above(&self, index: usize) -> Option<usize> {
        index.checked_sub(COLUMNS)
    }

    pub fn below(&self, index: usize) -> Option<usize> {
        let below = index + COLUMNS;
        (below < self.tiles.len()).then_some(below)
    }

    pub fn left(&self, index: usize) -> Option<usize> {
        (index % COLUMNS != 0).then(|| index - 1)
    }

    pub fn right(&self, index: usize) -> Option<usize> {
        ((index + 1) % COLUMNS != 0 && index + 1 < self.tiles.len()).then(|| index + 1)
    }

    fn kind_is(&self, index: Option<usize>, check: impl Fn(TileKind) -> bool) -> bool {
        index.and_then(|i| self.kind(i)).is_some_and(check)
    }

    pub fn count(&self, check: impl Fn(TileKind) -> bool) -> usize {
        self.tiles.iter().filter(|t| check(t.kind)).count()
    }

    pub fn flower_count(&self) -> usize {
        self.count(|k| matches!(k, TileKind::Flower | TileKind::Soulflower))
    }

    pub fn soulflower_count(&self) -> usize {
        self.count(|k| k == TileKind::Soulflower)
    }

    pub fn grave_count(&self) -> usize {
        self.count(|k| matches!(k, TileKind::Grave(_)))
    }

    pub fn tree_count(&self) -> usize {
        self.count(|k| k == TileKind::Tree)
    }

    pub fn empty_tiles(&self) -> Vec<usize> {
        (0..self.tiles.len())
            .filter(|&i| self.tiles[i].kind == TileKind::Empty)
            .collect()
    }

    pub fn scaryometer(&self) -> i32 {
        self.tiles.iter().map(|t| t.kind.scariness()).sum()
    }

    /// Whether `kind` may be placed on `index`.
    pub fn can_place(&self, index: usize, kind: TileKind) -> bool {
        if self.kind(index) != Some(TileKind::Empty) {
            return false;
        }
        match kind {
            TileKind::Bat => self.kind_is(self.below(index), |k| k == TileKind::Tree),
            TileKind::Ghost => self.kind_is(
                self.left(index).and_then(|l| self.below(l)),
                |k| matches!(k, TileKind::Grave(_)),
            ),
            _ => kind.is_built(),
        }
    }

    /// Tiles that disappear together with the one at `index`.
    ///
    /// A tombstone takes the grave below and the ghost to its right. A grave takes
    /// the ghost above-right. A tree takes the bat above.
    pub fn dependents(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        match self.kind(index) {
            Some(TileKind::Tombstone(_)) => {
                if let Some(below) = self.below(index).filter(|&b| matches!(self.kind(b), Some(TileKind::Grave(_)))) {
                    out.push(below);
                }
                if let Some(right) = self.right(index).filter(|&r| self.kind(r) == Some(TileKind::Ghost)) {
                    out.push(right);
                }
            }
            Some(TileKind::Grave(_)) => {
                let ghost = self.above(index).and_then(|a| self.right(a));
                if let Some(ghost) = ghost.filter(|&g| self.kind(g) == Some(TileKind::Ghost)) {
                    out.push(ghost);
                }
            }
            Some(TileKind::Tree) => {
                if let Some(bat) = self.above(index).filter(|&a| self.kind(a) == Some(TileKind::Bat)) {
                    out.push(bat);
                }
            }
            _ => {}
        }
        out
    }
}

/// Walk columns left to right from a random row, turning every few columns.
/// Returns the set of path squares and the character waypoints.
fn generate_path(rng: &mut Rng, columns: usize, rows: usize) -> (Vec<(usize, usize)>, Vec<(i32, i32)>) {
    let max_row = rows as i32 - 2;
    let mut path = Vec::new();
    let mut waypoints = Vec::new();
    let mut row = rng.random(1, max_row);

    for col in 0..columns {
        path.push((col, row as usize));
        if col == 0 {
            waypoints.push((-1, row));
            continue;
        }

        if col % TURN_EVERY_COLUMNS == 0 {
            waypoints.push((col as i32, row));

            let mut direction = if row <= 1 {
                1
            } else if row >= max_row {
                -1
            } else if rng.random(0, 1) == 1 {
                -1
            } else {
                1
            };
            let room = |direction: i32| if direction == -1 { row - 1 } else { max_row - row };
            let mut max_length = room(direction);
            if max_length < MIN_TURN_LENGTH {
                direction = -direction;
                max_length = room(direction);
            }

            let target = row + rng.random(MIN_TURN_LENGTH, max_length) * direction;
            while row != target {
                row += direction;
                path.push((col, row as usize));
            }
            waypoints.push((col as i32, row));
        } else if col == columns - 1 {
            waypoints.push((columns as i32, row));
        }
    }

    (path, waypoints)
}
