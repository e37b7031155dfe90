use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::{Index, IndexMut};

/// A compass direction naming a queue or an exit at an intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "N")]
    North,
    #[serde(rename = "S")]
    South,
    #[serde(rename = "E")]
    East,
    #[serde(rename = "W")]
    West,
}

impl Direction {
    /// All four directions, in fixed priority order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// The direction facing this one.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::South => 1,
            Direction::East => 2,
            Direction::West => 3,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "N",
            Direction::South => "S",
            Direction::East => "E",
            Direction::West => "W",
        };
        write!(f, "{}", name)
    }
}

/// A set of directions packed into a bitmask.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionSet(u8);

impl DirectionSet {
    /// The empty set.
    pub const EMPTY: DirectionSet = DirectionSet(0);
    /// All four directions.
    pub const ALL: DirectionSet = DirectionSet(0b1111);

    /// Adds a direction to the set.
    pub fn insert(&mut self, dir: Direction) {
        self.0 |= 1 << dir.index();
    }

    /// Returns true if the set contains the direction.
    pub fn contains(self, dir: Direction) -> bool {
        self.0 & (1 << dir.index()) != 0
    }

    /// Iterates the directions in the set, in priority order.
    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

impl FromIterator<Direction> for DirectionSet {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        let mut set = DirectionSet::EMPTY;
        for dir in iter {
            set.insert(dir);
        }
        set
    }
}

impl fmt::Debug for DirectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Per-direction storage indexed by [Direction].
///
/// Serializes as an object with one field per direction, so a record
/// missing a direction fails to decode rather than defaulting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DirectionMap<T>([T; 4]);

impl<T> DirectionMap<T> {
    /// Builds a map by evaluating `f` for each direction.
    pub fn from_fn(mut f: impl FnMut(Direction) -> T) -> Self {
        DirectionMap(std::array::from_fn(|i| f(Direction::ALL[i])))
    }

    /// Iterates entries in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, &T)> {
        Direction::ALL.into_iter().zip(self.0.iter())
    }

    /// Iterates entries mutably, in priority order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Direction, &mut T)> {
        Direction::ALL.into_iter().zip(self.0.iter_mut())
    }
}

impl<T> Index<Direction> for DirectionMap<T> {
    type Output = T;

    fn index(&self, dir: Direction) -> &T {
        &self.0[dir.index()]
    }
}

impl<T> IndexMut<Direction> for DirectionMap<T> {
    fn index_mut(&mut self, dir: Direction) -> &mut T {
        &mut self.0[dir.index()]
    }
}

#[derive(Serialize)]
struct MapRef<'a, T> {
    #[serde(rename = "N")]
    north: &'a T,
    #[serde(rename = "S")]
    south: &'a T,
    #[serde(rename = "E")]
    east: &'a T,
    #[serde(rename = "W")]
    west: &'a T,
}

#[derive(Deserialize)]
struct MapOwned<T> {
    #[serde(rename = "N")]
    north: T,
    #[serde(rename = "S")]
    south: T,
    #[serde(rename = "E")]
    east: T,
    #[serde(rename = "W")]
    west: T,
}

impl<T: Serialize> Serialize for DirectionMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        MapRef {
            north: &self[Direction::North],
            south: &self[Direction::South],
            east: &self[Direction::East],
            west: &self[Direction::West],
        }
        .serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for DirectionMap<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = MapOwned::deserialize(deserializer)?;
        Ok(DirectionMap([repr.north, repr.south, repr.east, repr.west]))
    }
}
