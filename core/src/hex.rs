//! Hex topology — neighbor resolution on a row-parity offset grid.
//!
//! Consecutive rows are laterally offset by half a cell, so even and odd
//! rows use different (Δcol, Δrow) tables to reach the same six directions.
//! Nothing here checks world bounds; callers clip with [`WorldExtent`].

use crate::types::Position;
use serde::{Deserialize, Serialize};

/// The six hex directions. The ordinal order is fixed and used everywhere
/// neighbors are enumerated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Direction {
    East      = 0,
    NorthEast = 1,
    NorthWest = 2,
    West      = 3,
    SouthWest = 4,
    SouthEast = 5,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::East,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::West,
        Direction::SouthWest,
        Direction::SouthEast,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::East      => Direction::West,
            Direction::NorthEast => Direction::SouthWest,
            Direction::NorthWest => Direction::SouthEast,
            Direction::West      => Direction::East,
            Direction::SouthWest => Direction::NorthEast,
            Direction::SouthEast => Direction::NorthWest,
        }
    }
}

// (Δcol, Δrow) indexed by Direction ordinal.
const EVEN_ROW_OFFSETS: [(i64, i64); 6] = [(1, 0), (1, 1), (0, 1), (-1, 0), (0, -1), (1, -1)];
const ODD_ROW_OFFSETS: [(i64, i64); 6] = [(1, 0), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1)];

/// One neighbor of a hex, tagged with the direction it lies in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NeighborHex {
    pub col:       i64,
    pub row:       i64,
    pub direction: Direction,
}

impl NeighborHex {
    pub fn position(&self) -> Position {
        Position::new(self.col, self.row)
    }
}

fn offsets_for_row(row: i64) -> &'static [(i64, i64); 6] {
    if row.rem_euclid(2) == 0 {
        &EVEN_ROW_OFFSETS
    } else {
        &ODD_ROW_OFFSETS
    }
}

/// All six neighbors of `(col, row)` in [`Direction::ALL`] order.
pub fn neighbors(col: i64, row: i64) -> [NeighborHex; 6] {
    let offsets = offsets_for_row(row);
    Direction::ALL.map(|direction| {
        let (dc, dr) = offsets[direction as usize];
        NeighborHex { col: col + dc, row: row + dr, direction }
    })
}

/// The neighbor of `(col, row)` in a single direction.
pub fn neighbor(col: i64, row: i64, direction: Direction) -> Position {
    let (dc, dr) = offsets_for_row(row)[direction as usize];
    Position::new(col + dc, row + dr)
}

/// Inclusive world bounds used to clip neighbor lists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorldExtent {
    pub min_col: i64,
    pub max_col: i64,
    pub min_row: i64,
    pub max_row: i64,
}

impl WorldExtent {
    pub fn contains(&self, position: Position) -> bool {
        (self.min_col..=self.max_col).contains(&position.col)
            && (self.min_row..=self.max_row).contains(&position.row)
    }

    /// Neighbors of `(col, row)` that fall inside the extent, order preserved.
    pub fn neighbors_within(&self, col: i64, row: i64) -> Vec<NeighborHex> {
        neighbors(col, row)
            .into_iter()
            .filter(|n| self.contains(n.position()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(n: &[NeighborHex; 6], d: Direction) -> (i64, i64) {
        let hex = n[d as usize];
        assert_eq!(hex.direction, d);
        (hex.col, hex.row)
    }

    #[test]
    fn even_row_example() {
        let n = neighbors(5, 10);
        assert_eq!(at(&n, Direction::East), (6, 10));
        assert_eq!(at(&n, Direction::NorthEast), (6, 11));
        assert_eq!(at(&n, Direction::NorthWest), (5, 11));
        assert_eq!(at(&n, Direction::West), (4, 10));
        assert_eq!(at(&n, Direction::SouthWest), (5, 9));
        assert_eq!(at(&n, Direction::SouthEast), (6, 9));
    }

    #[test]
    fn odd_row_example() {
        let n = neighbors(5, 11);
        assert_eq!(at(&n, Direction::East), (6, 11));
        assert_eq!(at(&n, Direction::NorthEast), (5, 12));
        assert_eq!(at(&n, Direction::NorthWest), (4, 12));
        assert_eq!(at(&n, Direction::West), (4, 11));
        assert_eq!(at(&n, Direction::SouthWest), (4, 10));
        assert_eq!(at(&n, Direction::SouthEast), (5, 10));
    }

    #[test]
    fn every_neighbor_points_back() {
        for row in -3..=6 {
            for col in -3..=6 {
                let n = neighbors(col, row);
                assert_eq!(n.len(), 6);
                for hex in n {
                    let back = neighbor(hex.col, hex.row, hex.direction.opposite());
                    assert_eq!(
                        back,
                        Position::new(col, row),
                        "({col},{row}) -> {:?} -> ({},{}) does not return",
                        hex.direction, hex.col, hex.row
                    );
                }
            }
        }
    }

    #[test]
    fn opposite_is_an_involution() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert_ne!(d.opposite(), d);
        }
    }

    #[test]
    fn extent_clips_corner() {
        let extent = WorldExtent { min_col: 0, max_col: 9, min_row: 0, max_row: 9 };
        let clipped = extent.neighbors_within(0, 0);
        let dirs: Vec<Direction> = clipped.iter().map(|n| n.direction).collect();
        assert_eq!(
            dirs,
            vec![Direction::East, Direction::NorthEast, Direction::NorthWest]
        );
    }
}
