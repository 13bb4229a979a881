//! Fixed fleet used by every analytics endpoint.
//!
//! The numbers are small and hand-picked so tests can assert exact values.

pub struct Depot {
    pub id: &'static str,
    pub name: &'static str,
    pub region: &'static str,
    pub branches: &'static [Branch],
    pub locomotives: &'static [Locomotive],
}

pub struct Branch {
    pub id: &'static str,
    pub core_stations: &'static [&'static str],
    /// `(terminal station, trips ending there)`
    pub terminals: &'static [(&'static str, u32)],
}

pub struct Locomotive {
    pub model: &'static str,
    pub number: &'static str,
    /// `(terminal station, visits)`
    pub trips: &'static [(&'static str, u32)],
}

impl Locomotive {
    pub fn total_trips(&self) -> u32 {
        self.trips.iter().map(|(_, visits)| visits).sum()
    }
}

pub static FLEET: &[Depot] = &[
    Depot {
        id: "TCH-1",
        name: "Moskva-Sortirovochnaya",
        region: "Moscow",
        branches: &[
            Branch {
                id: "TCH-1-B1",
                core_stations: &["Moskva", "Ryazan", "Michurinsk"],
                terminals: &[("Saratov", 42), ("Penza", 18)],
            },
            Branch {
                id: "TCH-1-B2",
                core_stations: &["Moskva", "Tula"],
                terminals: &[("Orel", 30)],
            },
        ],
        locomotives: &[
            Locomotive {
                model: "VL80S",
                number: "1245",
                trips: &[("Saratov", 20), ("Penza", 6)],
            },
            Locomotive {
                model: "2ES5K",
                number: "0042",
                trips: &[("Orel", 14), ("Saratov", 3)],
            },
        ],
    },
    Depot {
        id: "TCH-7",
        name: "Yaroslavl-Glavny",
        region: "Yaroslavl",
        branches: &[Branch {
            id: "TCH-7-B1",
            core_stations: &["Yaroslavl", "Danilov", "Vologda"],
            terminals: &[("Cherepovets", 25)],
        }],
        locomotives: &[Locomotive {
            model: "VL10",
            number: "0771",
            trips: &[("Cherepovets", 25)],
        }],
    },
    Depot {
        id: "TCH-12",
        name: "Tambov",
        region: "Tambov",
        branches: &[Branch {
            id: "TCH-12-B1",
            core_stations: &["Tambov", "Rtishchevo"],
            terminals: &[("Balashov", 12)],
        }],
        locomotives: &[Locomotive {
            model: "2TE116",
            number: "1507",
            trips: &[("Balashov", 12)],
        }],
    },
];

pub fn depot(id: &str) -> Option<&'static Depot> {
    FLEET.iter().find(|d| d.id == id)
}

pub fn locomotive(model: &str, number: &str) -> Option<(&'static Depot, &'static Locomotive)> {
    FLEET.iter().find_map(|d| {
        d.locomotives
            .iter()
            .find(|l| l.model == model && l.number == number)
            .map(|l| (d, l))
    })
}
