// Fichier principal de la bibliothèque Outpost
// Expose tous les modules pour le binaire de simulation et les tests d'intégration

pub mod types;          // Coordonnées, terrains, minerais et ressources
pub mod error;          // Erreurs du monde, de la configuration et des sauvegardes
pub mod config;         // Configuration TOML avec valeurs par défaut
pub mod terrain;        // Sources d'altitude : images et bruit de Perlin
pub mod mine;           // Gisements miniers
pub mod structure;      // Structures et leur registre
pub mod map;            // Grille de tuiles, placement des gisements et fenêtre de vue
pub mod pathfinding;    // Coût des trajets et recherche A*
pub mod connectivity;   // Parcours du réseau de tubes
pub mod mine_facility;  // Production des mines à chaque tour
pub mod colony;         // État de la partie et boucle de tours
pub mod persistence;    // Instantanés et fichiers JSON

// Ré-exportation des types principaux pour faciliter l'importation
pub use types::*;
pub use error::{ConfigError, SaveError, WorldError};
pub use config::Config;
pub use map::{Tile, TileMap};
pub use mine::{DepositId, Mine};
pub use structure::{Occupant, Structure, StructureId, StructureRegistry};
pub use mine_facility::{FacilityState, MineFacility};
pub use colony::{Colony, ColonyEvent};
pub use persistence::ColonySnapshot;
