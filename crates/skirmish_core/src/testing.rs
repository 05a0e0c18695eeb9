//! Shared world builder for unit tests.

use crate::data::Catalog;
use crate::entity::{CombatEntity, TargetHandle};
use crate::grid::{CellCoord, SpatialGrid};
use crate::house::{House, HouseId, Houses};
use crate::math::{Fixed, Vec2Fixed};
use crate::rules::RulesConfig;
use crate::techno_type::{Category, TechnoType, TypeTraits};
use crate::weapon::{ArmorType, Warhead, WeaponProfile};
use crate::world::World;

pub(crate) const NEUTRAL: u8 = 0;
pub(crate) const GREECE: u8 = 1;
pub(crate) const USSR: u8 = 2;
/// Allied with Greece.
pub(crate) const ENGLAND: u8 = 3;

pub(crate) struct Sandbox {
    pub world: World,
}

fn warhead(name: &str, modifiers: [u32; 5], walls: bool) -> Warhead {
    Warhead {
        modifiers,
        destroys_walls: walls,
        ..Warhead::uniform(name)
    }
}

fn weapon(catalog: &Catalog, name: &str, range: f64, rof: u32, attack: i32, warhead: Option<&str>) -> WeaponProfile {
    WeaponProfile {
        name: name.to_string(),
        range: Fixed::from_num(range),
        rate_of_fire: rof,
        attack,
        warhead: warhead.map(|w| catalog.find_warhead(w).unwrap()),
        anti_air: false,
        anti_ground: true,
        inaccurate: false,
        electric: false,
        suppressed_near_friendlies: false,
    }
}

struct TypeSpec<'a> {
    name: &'a str,
    category: Category,
    reward: i64,
    strength: i32,
    armor: ArmorType,
    primary: Option<&'a str>,
    secondary: Option<&'a str>,
    footprint: (u8, u8),
    traits: TypeTraits,
    targetable: bool,
}

impl<'a> TypeSpec<'a> {
    fn new(name: &'a str, category: Category, reward: i64, strength: i32) -> Self {
        Self {
            name,
            category,
            reward,
            strength,
            armor: ArmorType::None,
            primary: None,
            secondary: None,
            footprint: (1, 1),
            traits: TypeTraits::empty(),
            targetable: true,
        }
    }

    fn armor(mut self, armor: ArmorType) -> Self {
        self.armor = armor;
        self
    }

    fn primary(mut self, weapon: &'a str) -> Self {
        self.primary = Some(weapon);
        self
    }

    fn secondary(mut self, weapon: &'a str) -> Self {
        self.secondary = Some(weapon);
        self
    }

    fn footprint(mut self, width: u8, height: u8) -> Self {
        self.footprint = (width, height);
        self
    }

    fn traits(mut self, traits: TypeTraits) -> Self {
        self.traits = traits;
        self
    }

    fn untargetable(mut self) -> Self {
        self.targetable = false;
        self
    }

    fn build(self, catalog: &Catalog) -> TechnoType {
        let mut kind = TechnoType::new(self.name, self.category);
        kind.reward = self.reward;
        kind.max_strength = self.strength;
        kind.armor = self.armor;
        kind.primary = self.primary.map(|w| catalog.find_weapon(w).unwrap());
        kind.secondary = self.secondary.map(|w| catalog.find_weapon(w).unwrap());
        kind.width = self.footprint.0;
        kind.height = self.footprint.1;
        kind.traits = if self.targetable {
            kind.traits | self.traits
        } else {
            self.traits
        };
        kind
    }
}

fn catalog(rules: RulesConfig) -> Catalog {
    let mut c = Catalog::new(rules);
    c.add_warhead(warhead("SA", [100, 50, 60, 25, 25], false)).unwrap();
    c.add_warhead(warhead("AP", [30, 75, 75, 100, 50], true)).unwrap();
    c.add_warhead(Warhead {
        spread: 6,
        ..warhead("HE", [90, 75, 60, 25, 100], true)
    })
    .unwrap();
    c.add_warhead(warhead("Organic", [100, 0, 0, 0, 0], false)).unwrap();
    c.add_warhead(warhead("Mechanical", [0, 0, 100, 100, 0], false)).unwrap();

    let weapons = [
        weapon(&c, "M1Carbine", 3.0, 20, 15, Some("SA")),
        weapon(&c, "M60", 5.0, 20, 20, Some("SA")),
        weapon(&c, "75mm", 4.0, 40, 25, Some("AP")),
        weapon(&c, "120mm", 4.75, 80, 40, Some("AP")),
        weapon(&c, "MammothTusk", 5.0, 80, 75, Some("HE")),
        WeaponProfile {
            anti_air: true,
            anti_ground: false,
            ..weapon(&c, "Nike", 7.5, 20, 50, Some("AP"))
        },
        WeaponProfile {
            anti_air: true,
            ..weapon(&c, "Hellfire", 4.0, 60, 40, Some("AP"))
        },
        weapon(&c, "Heal", 1.75, 80, -50, Some("Organic")),
        weapon(&c, "GoodWrench", 1.75, 80, -100, Some("Mechanical")),
        weapon(&c, "DogJaw", 1.5, 10, 100, Some("Organic")),
        weapon(&c, "Blank", 2.0, 20, 10, None),
        WeaponProfile {
            inaccurate: true,
            suppressed_near_friendlies: true,
            ..weapon(&c, "155mm", 6.0, 65, 150, Some("HE"))
        },
        weapon(&c, "TurretGun", 4.0, 30, 30, Some("AP")),
        weapon(&c, "Torpedo", 9.0, 60, 90, Some("AP")),
    ];
    for w in weapons {
        c.add_weapon(w).unwrap();
    }

    use ArmorType::{Aluminum, Steel, Wood};
    use Category::{Aircraft, Building, Infantry, Unit, Vessel};
    let types = [
        TypeSpec::new("E1", Infantry, 100, 50).primary("M1Carbine"),
        TypeSpec::new("MEDI", Infantry, 200, 80).primary("Heal"),
        TypeSpec::new("MECH", Infantry, 500, 70)
            .primary("GoodWrench")
            .traits(TypeTraits::MECHANIC),
        TypeSpec::new("DOG", Infantry, 200, 12)
            .primary("DogJaw")
            .traits(TypeTraits::DOG),
        TypeSpec::new("SPY", Infantry, 500, 25).traits(TypeTraits::INFILTRATOR),
        TypeSpec::new("DUD", Infantry, 50, 50).primary("Blank"),
        TypeSpec::new("C1", Infantry, 10, 25),
        TypeSpec::new("1TNK", Unit, 700, 300).armor(Steel).primary("75mm"),
        TypeSpec::new("4TNK", Unit, 1700, 600)
            .armor(Steel)
            .primary("120mm")
            .secondary("MammothTusk"),
        TypeSpec::new("TURR", Unit, 600, 200).armor(Steel).primary("TurretGun"),
        TypeSpec::new("APC", Unit, 600, 200).armor(Aluminum),
        TypeSpec::new("JEEP", Unit, 600, 150).armor(Aluminum).primary("M60"),
        TypeSpec::new("HUSK", Unit, 100, 100).armor(Steel).untargetable(),
        TypeSpec::new("ARTY", Unit, 600, 75).armor(Aluminum).primary("155mm"),
        TypeSpec::new("HARV", Unit, 1400, 600)
            .armor(Steel)
            .traits(TypeTraits::HARVESTER),
        TypeSpec::new("STNK", Unit, 900, 110)
            .armor(Aluminum)
            .primary("75mm")
            .traits(TypeTraits::CLOAKABLE),
        TypeSpec::new("GHOST", Unit, 500, 100).traits(TypeTraits::INVISIBLE),
        TypeSpec::new("KAMI", Unit, 300, 50)
            .primary("75mm")
            .traits(TypeTraits::SUICIDE),
        TypeSpec::new("HELI", Aircraft, 1200, 225)
            .armor(Aluminum)
            .primary("Hellfire"),
        TypeSpec::new("SS", Vessel, 950, 120)
            .armor(Steel)
            .primary("Torpedo")
            .traits(TypeTraits::SUBMARINE | TypeTraits::CLOAKABLE),
        TypeSpec::new("DD", Vessel, 1000, 400)
            .armor(Steel)
            .primary("75mm")
            .traits(TypeTraits::DETECTS_CLOAKED),
        TypeSpec::new("POWR", Building, 300, 400)
            .armor(Wood)
            .footprint(2, 2)
            .traits(TypeTraits::POWER | TypeTraits::CAPTURABLE),
        TypeSpec::new("WEAP", Building, 2000, 1000)
            .armor(Steel)
            .footprint(3, 2)
            .traits(TypeTraits::FACTORY | TypeTraits::CAPTURABLE),
        TypeSpec::new("PROC", Building, 2000, 900)
            .armor(Wood)
            .footprint(3, 2)
            .traits(TypeTraits::CAPTURABLE),
        TypeSpec::new("FAKE", Building, 50, 100)
            .armor(Wood)
            .footprint(3, 2)
            .traits(TypeTraits::FAKE),
        TypeSpec::new("GUN", Building, 600, 400)
            .armor(Steel)
            .primary("TurretGun")
            .traits(TypeTraits::BASE_DEFENSE),
        TypeSpec::new("SAM", Building, 750, 400)
            .armor(Steel)
            .primary("Nike")
            .traits(TypeTraits::BASE_DEFENSE),
        TypeSpec::new("SPEN", Building, 650, 1000)
            .armor(Wood)
            .footprint(3, 3)
            .traits(TypeTraits::NAVAL_STRUCTURE | TypeTraits::CAPTURABLE),
    ];
    for spec in types {
        let mut kind = spec.build(&c);
        if kind.name == "TURR" {
            kind.fire_offset = Vec2Fixed::new(Fixed::from_num(0.5), Fixed::ZERO);
        }
        if kind.name == "PROC" {
            kind.storage = 2000;
        }
        c.add_type(kind).unwrap();
    }
    c
}

impl Sandbox {
    pub fn new() -> Self {
        Self::with_rules(RulesConfig::default())
    }

    pub fn with_rules(rules: RulesConfig) -> Self {
        let mut houses = Houses::new();
        houses.insert(House::new(HouseId(NEUTRAL), "Neutral")).unwrap();
        houses.insert(House::new(HouseId(GREECE), "Greece")).unwrap();
        houses.insert(House::new(HouseId(USSR), "USSR")).unwrap();
        houses.insert(House::new(HouseId(ENGLAND), "England")).unwrap();
        houses.make_ally(HouseId(GREECE), HouseId(ENGLAND));

        let grid = SpatialGrid::new(32, 32, Fixed::ONE);
        Self {
            world: World::new(grid, houses, catalog(rules)),
        }
    }

    /// Place an object and reveal it to every house.
    pub fn place(&mut self, name: &str, house: u8, x: i32, y: i32) -> TargetHandle {
        let handle = self.place_unrevealed(name, house, x, y);
        let ids: Vec<HouseId> = self.world.houses.iter().map(|h| h.id).collect();
        for id in ids {
            self.world.reveal(handle, id);
        }
        handle
    }

    pub fn place_unrevealed(&mut self, name: &str, house: u8, x: i32, y: i32) -> TargetHandle {
        let id = self
            .world
            .catalog
            .find_type(name)
            .unwrap_or_else(|| panic!("unknown type {name}"));
        let handle = self.world.spawn(id, HouseId(house)).unwrap();
        self.world.unlimbo(handle, CellCoord::new(x, y)).unwrap();
        handle
    }

    pub fn entity(&self, handle: TargetHandle) -> &CombatEntity {
        self.world.entity(handle).unwrap()
    }

    pub fn relocate(&mut self, handle: TargetHandle, x: Fixed, y: Fixed) {
        self.world.relocate(handle, Vec2Fixed::new(x, y)).unwrap();
    }

    pub fn house_mut(&mut self, house: u8) -> &mut House {
        self.world.houses.get_mut(HouseId(house)).unwrap()
    }
}
