//! Static registry of the covered municipalities and their polling
//! stations. Selections are validated against this table, and display names
//! for logging come from it.

use shared::domain::{KommuneId, ValgstedId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kommune {
    pub id: &'static str,
    pub navn: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valgsted {
    pub id: &'static str,
    pub navn: &'static str,
}

pub fn kommuner() -> &'static [Kommune] {
    KOMMUNER
}

pub fn kommune_navn(id: &KommuneId) -> Option<&'static str> {
    KOMMUNER
        .iter()
        .find(|kommune| kommune.id == id.as_str())
        .map(|kommune| kommune.navn)
}

/// Polling stations for a municipality; empty for unknown municipalities and
/// for the ones that vote by letter only.
pub fn valgsteder_for(kommune: &KommuneId) -> &'static [Valgsted] {
    VALGSTEDER
        .iter()
        .find(|(id, _)| *id == kommune.as_str())
        .map(|(_, stations)| *stations)
        .unwrap_or(&[])
}

pub fn valgsted_navn(kommune: &KommuneId, valgsted: &ValgstedId) -> Option<&'static str> {
    valgsteder_for(kommune)
        .iter()
        .find(|station| station.id == valgsted.as_str())
        .map(|station| station.navn)
}

pub fn contains_valgsted(kommune: &KommuneId, valgsted: &ValgstedId) -> bool {
    valgsted_navn(kommune, valgsted).is_some()
}

static KOMMUNER: &[Kommune] = &[
    Kommune { id: "810", navn: "Brønderslev" },
    Kommune { id: "813", navn: "Frederikshavn" },
    Kommune { id: "820", navn: "Vesthimmerlands" },
    Kommune { id: "825", navn: "Læsø" },
    Kommune { id: "840", navn: "Rebild" },
    Kommune { id: "846", navn: "Mariagerfjord" },
    Kommune { id: "849", navn: "Jammerbugt" },
    Kommune { id: "851", navn: "Aalborg" },
    Kommune { id: "860", navn: "Hjørring" },
];

static VALGSTEDER: &[(&str, &[Valgsted])] = &[
    ("810", &[
        Valgsted { id: "81001", navn: "Agersted" },
        Valgsted { id: "81002", navn: "Asaa" },
        Valgsted { id: "81003", navn: "Dronninglund" },
        Valgsted { id: "81004", navn: "Flauenskjold" },
        Valgsted { id: "81005", navn: "Hjallerup" },
        Valgsted { id: "81006", navn: "Klokkerholm" },
        Valgsted { id: "81007", navn: "Brønderslev" },
    ]),
    ("813", &[
        Valgsted { id: "81301", navn: "Skagen" },
        Valgsted { id: "81302", navn: "Hulsig" },
        Valgsted { id: "81303", navn: "Ålbæk" },
        Valgsted { id: "81304", navn: "Jerup" },
        Valgsted { id: "81305", navn: "Elling" },
        Valgsted { id: "81306", navn: "Strandby" },
        Valgsted { id: "81307", navn: "Frederikshavn Nord" },
        Valgsted { id: "81308", navn: "Frederikshavn Midt" },
        Valgsted { id: "81309", navn: "Frederikshavn Syd" },
        Valgsted { id: "81310", navn: "Ravnshøj" },
        Valgsted { id: "81311", navn: "Gærum" },
        Valgsted { id: "81312", navn: "Sæby" },
        Valgsted { id: "81313", navn: "Brønden" },
        Valgsted { id: "81314", navn: "Dybvad" },
        Valgsted { id: "81315", navn: "Hørby" },
        Valgsted { id: "81316", navn: "Præstbro" },
        Valgsted { id: "81317", navn: "Thorshøj" },
        Valgsted { id: "81318", navn: "Understed" },
        Valgsted { id: "81319", navn: "Voerså" },
        Valgsted { id: "81320", navn: "Volstrup" },
        Valgsted { id: "81321", navn: "Østervrå" },
        Valgsted { id: "81322", navn: "Lyngså" },
    ]),
    ("820", &[
        Valgsted { id: "82001", navn: "Aalestrup" },
        Valgsted { id: "82002", navn: "Farsø" },
        Valgsted { id: "82003", navn: "Strandby" },
        Valgsted { id: "82004", navn: "Aars" },
        Valgsted { id: "82005", navn: "Hvalpsund" },
        Valgsted { id: "82006", navn: "Gislum-Vognsild" },
        Valgsted { id: "82007", navn: "Gedsted" },
        Valgsted { id: "82008", navn: "Hornum-Ulstrup" },
        Valgsted { id: "82009", navn: "Vester Hornum" },
        Valgsted { id: "82010", navn: "Løgstør" },
        Valgsted { id: "82011", navn: "Ranum" },
        Valgsted { id: "82012", navn: "Salling" },
        Valgsted { id: "82013", navn: "Overlade" },
        Valgsted { id: "82014", navn: "Skivum-Giver" },
    ]),
    ("825", &[
    ]),
    ("840", &[
        Valgsted { id: "84001", navn: "Støvring" },
        Valgsted { id: "84002", navn: "Skørping" },
        Valgsted { id: "84003", navn: "Terndrup" },
        Valgsted { id: "84004", navn: "Suldrup" },
        Valgsted { id: "84005", navn: "Nørager" },
        Valgsted { id: "84006", navn: "Haverslev" },
        Valgsted { id: "84007", navn: "Øster Hornum" },
        Valgsted { id: "84008", navn: "Bælum" },
        Valgsted { id: "84009", navn: "Ravnkilde" },
        Valgsted { id: "84010", navn: "Blenstrup" },
        Valgsted { id: "84011", navn: "Veggerby" },
    ]),
    ("846", &[
        Valgsted { id: "84601", navn: "Assens" },
        Valgsted { id: "84602", navn: "Mariager" },
        Valgsted { id: "84603", navn: "Arden" },
        Valgsted { id: "84604", navn: "Valsgård" },
        Valgsted { id: "84605", navn: "Vebbestrup" },
        Valgsted { id: "84606", navn: "Hadsund" },
        Valgsted { id: "84607", navn: "Veddum-Skelund" },
        Valgsted { id: "84608", navn: "Als" },
        Valgsted { id: "84609", navn: "Hørby" },
        Valgsted { id: "84610", navn: "Onsild" },
    ]),
    ("849", &[
        Valgsted { id: "84901", navn: "Aabybro" },
        Valgsted { id: "84902", navn: "Biersted" },
        Valgsted { id: "84903", navn: "Nørhalne" },
        Valgsted { id: "84904", navn: "Vedsted" },
        Valgsted { id: "84905", navn: "Gjøl" },
        Valgsted { id: "84906", navn: "Ingstrup" },
        Valgsted { id: "84907", navn: "V. Hjermitslev" },
        Valgsted { id: "84908", navn: "Brovst" },
        Valgsted { id: "84909", navn: "Halvrimmen" },
        Valgsted { id: "84910", navn: "Arentsminde" },
        Valgsted { id: "84911", navn: "Tranum" },
        Valgsted { id: "84912", navn: "Skovsgård" },
        Valgsted { id: "84913", navn: "Fjerritslev" },
        Valgsted { id: "84914", navn: "Thorup" },
        Valgsted { id: "84915", navn: "Ørebro" },
        Valgsted { id: "84916", navn: "Trekroner" },
        Valgsted { id: "84917", navn: "Pandrup" },
        Valgsted { id: "84918", navn: "Kaas" },
        Valgsted { id: "84919", navn: "Hune" },
        Valgsted { id: "84920", navn: "Saltum" },
    ]),
    ("851", &[
        Valgsted { id: "85101", navn: "Gl. Lindholm Skole" },
        Valgsted { id: "85102", navn: "Kulturhus PFA Kollegiet i Nørresundby" },
        Valgsted { id: "85103", navn: "Løvvanghallen" },
        Valgsted { id: "85104", navn: "Multihallen" },
        Valgsted { id: "85105", navn: "Ved Vadumhallen" },
        Valgsted { id: "85106", navn: "Sulsted Skolehal" },
        Valgsted { id: "85107", navn: "Vodskov Kultur & Idrætscenter" },
        Valgsted { id: "85108", navn: "HF&VUC Nord, Godsbanen" },
        Valgsted { id: "85109", navn: "Vesterkærets Skole" },
        Valgsted { id: "85110", navn: "Haraldslund" },
        Valgsted { id: "85111", navn: "Aalborghallen" },
        Valgsted { id: "85112", navn: "Skipperens Idrætshus" },
        Valgsted { id: "85113", navn: "Hallen Ved Skalborggård" },
        Valgsted { id: "85114", navn: "Kfum - Hallen" },
        Valgsted { id: "85115", navn: "Hasseris Gymnasium" },
        Valgsted { id: "85116", navn: "Frejlev Skoles Idrætshal" },
        Valgsted { id: "85117", navn: "Svenstruphallen" },
        Valgsted { id: "85118", navn: "Idrætshallen Østre Alle" },
        Valgsted { id: "85119", navn: "Nordkraft" },
        Valgsted { id: "85120", navn: "Gigantium" },
        Valgsted { id: "85121", navn: "Vejgaardhallen" },
        Valgsted { id: "85122", navn: "Vejgaard Østre Skole" },
        Valgsted { id: "85123", navn: "Mellervangskolens Idrætshal" },
        Valgsted { id: "85124", navn: "Klaruphallen" },
        Valgsted { id: "85125", navn: "Gug Skole" },
        Valgsted { id: "85126", navn: "Gistrup Skoles Idrætshal" },
        Valgsted { id: "85127", navn: "Aalborghus Gymnasium" },
        Valgsted { id: "85128", navn: "Ferslev Skolehal" },
        Valgsted { id: "85129", navn: "Tornhøjskolen, Hallen" },
        Valgsted { id: "85130", navn: "Vester Hassing Hallen" },
        Valgsted { id: "85131", navn: "Hals Skole" },
        Valgsted { id: "85132", navn: "Ulstedhallen" },
        Valgsted { id: "85133", navn: "Nibe Hallen" },
        Valgsted { id: "85134", navn: "Farstruphallen" },
        Valgsted { id: "85135", navn: "Idrætscentret Kongerslev" },
        Valgsted { id: "85136", navn: "Mou Hotel" },
        Valgsted { id: "85137", navn: "Båndby - Hallen" },
    ]),
    ("860", &[
        Valgsted { id: "86001", navn: "Horne" },
        Valgsted { id: "86002", navn: "Hirtshals" },
        Valgsted { id: "86003", navn: "Hjørring - Centrum" },
        Valgsted { id: "86004", navn: "Tornby" },
        Valgsted { id: "86005", navn: "Bindslev" },
        Valgsted { id: "86006", navn: "Tversted" },
        Valgsted { id: "86007", navn: "Taars" },
        Valgsted { id: "86008", navn: "Vrejlev-Hæstrup" },
        Valgsted { id: "86009", navn: "Bjergby-Mygdal" },
        Valgsted { id: "86010", navn: "Skallerup" },
        Valgsted { id: "86011", navn: "Hjørring - Nord" },
        Valgsted { id: "86012", navn: "Hjørring - Syd" },
        Valgsted { id: "86013", navn: "Hjørring - Vest" },
        Valgsted { id: "86014", navn: "Vrå" },
        Valgsted { id: "86015", navn: "Hundelev" },
        Valgsted { id: "86016", navn: "Løkken" },
        Valgsted { id: "86017", navn: "Sindal" },
        Valgsted { id: "86018", navn: "Astrup" },
        Valgsted { id: "86019", navn: "Tolne" },
        Valgsted { id: "86020", navn: "Ugilt" },
        Valgsted { id: "86021", navn: "Lendum" },
    ]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_names_for_known_selections() {
        assert_eq!(kommune_navn(&KommuneId::from("860")), Some("Hjørring"));
        assert_eq!(
            valgsted_navn(&KommuneId::from("860"), &ValgstedId::from("86002")),
            Some("Hirtshals")
        );
    }

    #[test]
    fn rejects_stations_outside_their_municipality() {
        // 85111 is an Aalborg station; it must not validate under Hjørring.
        assert!(contains_valgsted(
            &KommuneId::from("851"),
            &ValgstedId::from("85111")
        ));
        assert!(!contains_valgsted(
            &KommuneId::from("860"),
            &ValgstedId::from("85111")
        ));
    }

    #[test]
    fn municipalities_without_stations_yield_an_empty_list() {
        // Læsø votes without sub-stations in this dataset.
        assert!(valgsteder_for(&KommuneId::from("825")).is_empty());
        assert!(valgsteder_for(&KommuneId::from("999")).is_empty());
    }

    #[test]
    fn unknown_municipalities_have_no_name() {
        assert_eq!(kommune_navn(&KommuneId::from("999")), None);
    }
}
