use ledscene_app::{
    types::{Animation, ColorSegment, Pattern, PatternId, Scene, SceneTable, StripId},
    BoardConfig, Pin, StripConfig, Token, PIN_MAX_LEN,
};

/// Pairing PIN of a device fresh from the factory.
pub const DEFAULT_PIN: &str = "0000";

/// State written to an empty store on the first boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryDefaults {
    pub brightness: u8,
    pub pin: Pin,
    pub token: Token,
    pub patterns: Vec<Pattern>,
    pub scenes: SceneTable,
}

impl FactoryDefaults {
    /// Defaults with no patterns and no scenes.
    pub fn blank() -> Self {
        let mut pin = Pin::new();
        if pin.push_str(DEFAULT_PIN).is_err() {
            log::error!("Default pin does not fit into {PIN_MAX_LEN} bytes, leaving it empty");
        }

        Self {
            brightness: u8::MAX,
            pin,
            token: *b"1234567891113150",
            patterns: Vec::new(),
            scenes: SceneTable::default(),
        }
    }
}

/// Demo patterns for the two strips of [`demo_board`].
impl Default for FactoryDefaults {
    fn default() -> Self {
        let breath = Animation::breath(0, 34, 1);

        let patterns = vec![
            Pattern::new(PatternId(0), "P0")
                .with_brightness(25)
                .with_segment(ColorSegment::gradient(14, 29, 0x00_00FF, 0))
                .with_segment(ColorSegment::gradient(44, 59, 0x00_00FF, 0))
                .with_segment(ColorSegment::gradient(60, 75, 0, 0x00_00FF))
                .with_segment(ColorSegment::gradient(90, 105, 0, 0x00_00FF))
                .with_animation(Animation::trail(0, 59, 1))
                .with_animation(Animation::trail(119, 60, 1)),
            Pattern::new(PatternId(1), "P1")
                .with_brightness(25)
                .with_segment(ColorSegment::gradient(0, 69, 0xFF_0000, 0))
                .with_animation(breath),
            Pattern::new(PatternId(2), "P2")
                .with_brightness(100)
                .with_segment(ColorSegment::gradient(0, 69, 0x00_FF00, 0))
                .with_animation(breath)
                .with_animation(Animation::trail(0, 20, 1)),
        ];

        let scenes = SceneTable {
            scenes: vec![
                Scene::new("Scene0")
                    .with_link(StripId(18), PatternId(0))
                    .with_link(StripId(19), PatternId(1)),
                Scene::new("Scene1")
                    .with_link(StripId(18), PatternId(2))
                    .with_link(StripId(19), PatternId(2)),
            ],
            selected: Some(1),
        };

        Self {
            patterns,
            scenes,
            ..Self::blank()
        }
    }
}

/// Board with the two strips the factory defaults are made for.
pub fn demo_board() -> BoardConfig {
    BoardConfig::new(vec![
        StripConfig::new(18, 120, "Cross/"),
        StripConfig::new(19, 70, "Cross\\"),
    ])
}
