//! Built-in regional holiday data.
//!
//! Year-specific lists are authoritative for the years they cover. The
//! recurring tables are the fallback for every other year and carry no
//! movable feasts (Easter-relative days, Monday bridges).

pub(crate) type Entry = (u32, u32, &'static str, Option<&'static str>);

pub(crate) struct YearTable {
    pub region: &'static str,
    pub year: i32,
    pub entries: &'static [Entry],
}

pub(crate) struct RecurringTable {
    pub region: &'static str,
    pub entries: &'static [(u32, u32, &'static str)],
}

pub(crate) const REGION_NAMES: &[(&str, &str)] = &[
    ("madrid", "Madrid, España"),
    ("andalucia", "Andalucía, España"),
    ("mexico", "México"),
    ("santiago_chile", "Santiago de Chile, Chile"),
    ("caracas", "Caracas, Venezuela"),
    ("bogota", "Bogotá, Colombia"),
];

pub(crate) const REGION_ALIASES: &[(&str, &str)] =
    &[("colombia", "bogota"), ("chile", "santiago_chile")];

const BRIDGE: Option<&str> = Some("Feriado puente");
const RELIGIOUS: Option<&str> = Some("Religioso");
const MANDATORY: Option<&str> = Some("Irrenunciable");

const COLOMBIA_2026: &[Entry] = &[
    (1, 1, "Año Nuevo", None),
    (1, 12, "Reyes Magos", None),
    (3, 23, "Día de San José", None),
    (4, 2, "Jueves Santo", None),
    (4, 3, "Viernes Santo", None),
    (5, 1, "Día del trabajo", None),
    (5, 18, "Ascensión de Jesús", None),
    (6, 8, "Corpus Christi", None),
    (6, 15, "Sagrado Corazón de Jesús", None),
    (6, 29, "San Pedro y San Pablo", None),
    (7, 20, "Día de la independencia", None),
    (8, 7, "Batalla de Boyacá", None),
    (8, 17, "Asunción de la Virgen", None),
    (10, 12, "Día de la raza", None),
    (11, 2, "Todos los Santos", None),
    (11, 16, "Independencia de Cartagena", None),
    (12, 8, "Inmaculada Concepción", None),
    (12, 25, "Navidad", None),
];

const CHILE_2026: &[Entry] = &[
    (1, 1, "Año Nuevo", MANDATORY),
    (4, 3, "Viernes Santo", RELIGIOUS),
    (4, 4, "Sábado Santo", RELIGIOUS),
    (5, 1, "Día Nacional del Trabajo", MANDATORY),
    (5, 21, "Día de las Glorias Navales", None),
    (6, 21, "Día Nacional de los Pueblos Indígenas", None),
    (6, 29, "San Pedro y San Pablo", RELIGIOUS),
    (7, 16, "Día de la Virgen del Carmen", RELIGIOUS),
    (8, 15, "Asunción de la Virgen", RELIGIOUS),
    (9, 18, "Independencia Nacional", MANDATORY),
    (9, 19, "Día de las Glorias del Ejército", MANDATORY),
    (10, 12, "Encuentro de Dos Mundos", None),
    (10, 31, "Día de las Iglesias Evangélicas y Protestantes", RELIGIOUS),
    (11, 1, "Día de Todos los Santos", RELIGIOUS),
    (12, 8, "Inmaculada Concepción", RELIGIOUS),
    (12, 25, "Navidad", MANDATORY),
];

pub(crate) const YEAR_SPECIFIC: &[YearTable] = &[
    YearTable {
        region: "mexico",
        year: 2024,
        entries: &[
            (1, 1, "Año Nuevo", None),
            (2, 5, "Día de la Constitución", None),
            (3, 18, "Natalicio de Benito Juárez", BRIDGE),
            (5, 1, "Día del Trabajo", None),
            (9, 16, "Día de la Independencia Mexicana", None),
            (11, 18, "Día de la Revolución Mexicana", BRIDGE),
            (12, 25, "Navidad", None),
        ],
    },
    YearTable {
        region: "mexico",
        year: 2025,
        entries: &[
            (1, 1, "Año Nuevo", None),
            (2, 3, "Día de la Constitución", Some("Feriado puente, trasladado del 5 de febrero")),
            (
                3,
                17,
                "Natalicio de Benito Juárez",
                Some("Feriado puente, trasladado del 21 de marzo"),
            ),
            (5, 1, "Día del Trabajo", None),
            (9, 16, "Día de la Independencia Mexicana", None),
            (
                11,
                17,
                "Día de la Revolución Mexicana",
                Some("Feriado puente, trasladado del 20 de noviembre"),
            ),
            (12, 25, "Navidad", None),
        ],
    },
    YearTable {
        region: "mexico",
        year: 2026,
        entries: &[
            (1, 1, "Año Nuevo", None),
            (2, 2, "Día de la Constitución", Some("Feriado puente, trasladado del 5 de febrero")),
            (
                3,
                16,
                "Natalicio de Benito Juárez",
                Some("Feriado puente, trasladado del 21 de marzo"),
            ),
            (5, 1, "Día del Trabajo", BRIDGE),
            (9, 16, "Día de la Independencia Mexicana", None),
            (
                11,
                16,
                "Día de la Revolución Mexicana",
                Some("Feriado puente, trasladado del 20 de noviembre"),
            ),
            (12, 25, "Navidad", BRIDGE),
        ],
    },
    YearTable {
        region: "madrid",
        year: 2026,
        entries: &[
            (1, 1, "Año Nuevo", None),
            (1, 6, "Epifanía del Señor", None),
            (4, 2, "Jueves Santo", None),
            (4, 3, "Viernes Santo", None),
            (5, 1, "Fiesta del Trabajo", None),
            (5, 2, "Fiesta de la Comunidad de Madrid", None),
            (8, 15, "Asunción de la Virgen", None),
            (10, 12, "Fiesta Nacional de España", None),
            (11, 2, "Traslado de Todos los Santos", None),
            (12, 7, "Traslado del Día de la Constitución Española", None),
            (12, 8, "Día de la Inmaculada Concepción", None),
            (12, 25, "Natividad del Señor", None),
        ],
    },
    YearTable {
        region: "andalucia",
        year: 2026,
        entries: &[
            (1, 1, "Año Nuevo", None),
            (1, 6, "Epifanía del Señor", None),
            (2, 28, "Día de Andalucía", None),
            (4, 2, "Jueves Santo", None),
            (4, 3, "Viernes Santo", None),
            (4, 22, "Miércoles de Feria", None),
            (5, 1, "Fiesta del Trabajo", None),
            (6, 4, "Fiesta del Corpus Cristi", None),
            (8, 15, "Asunción de la Virgen", None),
            (10, 12, "Fiesta Nacional de España", None),
            (11, 2, "Festividad de todos los santos (Traslado)", None),
            (12, 7, "Día de la Constitución (Traslado)", None),
            (12, 8, "La Inmaculada Concepción", None),
            (12, 25, "Natividad del Señor", None),
        ],
    },
    YearTable { region: "bogota", year: 2026, entries: COLOMBIA_2026 },
    YearTable { region: "santiago_chile", year: 2026, entries: CHILE_2026 },
];

const SPAIN_NATIONAL: &[(u32, u32, &str)] = &[
    (1, 1, "Año Nuevo"),
    (1, 6, "Epifanía del Señor / Día de Reyes"),
    (5, 1, "Fiesta del Trabajo"),
    (8, 15, "Asunción de la Virgen"),
    (10, 12, "Fiesta Nacional de España"),
    (11, 1, "Todos los Santos"),
    (12, 6, "Día de la Constitución"),
    (12, 8, "Inmaculada Concepción"),
    (12, 25, "Navidad"),
];

pub(crate) const RECURRING: &[RecurringTable] = &[
    RecurringTable { region: "madrid", entries: SPAIN_NATIONAL },
    RecurringTable {
        region: "madrid",
        entries: &[
            (5, 2, "Fiesta de la Comunidad de Madrid"),
            (5, 15, "San Isidro (Patrón de Madrid)"),
        ],
    },
    RecurringTable { region: "andalucia", entries: SPAIN_NATIONAL },
    RecurringTable { region: "andalucia", entries: &[(2, 28, "Día de Andalucía")] },
    RecurringTable {
        region: "mexico",
        entries: &[
            (1, 1, "Año Nuevo"),
            (2, 5, "Día de la Constitución"),
            (3, 21, "Natalicio de Benito Juárez"),
            (5, 1, "Día del Trabajo"),
            (9, 16, "Día de la Independencia"),
            (11, 20, "Día de la Revolución"),
            (12, 25, "Navidad"),
        ],
    },
    RecurringTable {
        region: "santiago_chile",
        entries: &[
            (1, 1, "Año Nuevo"),
            (5, 1, "Día del Trabajo"),
            (5, 21, "Día de las Glorias Navales"),
            (6, 29, "San Pedro y San Pablo"),
            (7, 16, "Día de la Virgen del Carmen"),
            (8, 15, "Asunción de la Virgen"),
            (9, 18, "Primera Junta Nacional de Gobierno"),
            (9, 19, "Día de las Glorias del Ejército"),
            (10, 12, "Encuentro de Dos Mundos"),
            (11, 1, "Día de Todos los Santos"),
            (12, 8, "Inmaculada Concepción"),
            (12, 25, "Navidad"),
        ],
    },
    RecurringTable {
        region: "caracas",
        entries: &[
            (1, 1, "Año Nuevo"),
            (2, 19, "Día de la Federación"),
            (2, 20, "Carnaval"),
            (3, 19, "Día de San José"),
            (4, 19, "Declaración de la Independencia"),
            (5, 1, "Día del Trabajador"),
            (6, 24, "Batalla de Carabobo"),
            (7, 5, "Día de la Independencia"),
            (7, 24, "Natalicio del Libertador Simón Bolívar"),
            (10, 12, "Día de la Resistencia Indígena"),
            (12, 24, "Nochebuena"),
            (12, 25, "Navidad"),
            (12, 31, "Fin de Año"),
        ],
    },
    RecurringTable {
        region: "bogota",
        entries: &[
            (1, 1, "Año Nuevo"),
            (1, 8, "Día de los Reyes Magos"),
            (3, 19, "Día de San José"),
            (5, 1, "Día del Trabajo"),
            (5, 29, "Ascensión del Señor"),
            (6, 19, "Corpus Christi"),
            (6, 26, "Sagrado Corazón de Jesús"),
            (7, 20, "Día de la Independencia"),
            (8, 7, "Batalla de Boyacá"),
            (8, 20, "Asunción de la Virgen"),
            (10, 15, "Día de la Raza"),
            (11, 5, "Día de Todos los Santos"),
            (11, 12, "Independencia de Cartagena"),
            (12, 8, "Inmaculada Concepción"),
            (12, 25, "Navidad"),
        ],
    },
];
