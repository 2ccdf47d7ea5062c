use super::Platform;

/// Defines the builtin function table: one variant per builtin, with its
/// spelling in the node-graph dialect and in the flow-graph dialect.
macro_rules! define_builtins {
    ( $( ($variant:ident, $node_name:literal, $flow_name:literal) ),* $(,)? ) => {
        /// A function both dialects know, under different names.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Builtin {
            $( $variant, )*
        }

        impl Builtin {
            pub const ALL: &'static [Builtin] = &[ $( Builtin::$variant, )* ];

            /// The spelling of this builtin in the given dialect.
            pub fn name(self, platform: Platform) -> &'static str {
                match (self, platform) {
                    $(
                        (Builtin::$variant, Platform::NodeGraph) => $node_name,
                        (Builtin::$variant, Platform::FlowGraph) => $flow_name,
                    )*
                }
            }

            /// Looks a function name up in one dialect's table.
            pub fn from_name(name: &str, platform: Platform) -> Option<Builtin> {
                match platform {
                    Platform::NodeGraph => match name {
                        $( $node_name => Some(Builtin::$variant), )*
                        _ => None,
                    },
                    Platform::FlowGraph => match name {
                        $( $flow_name => Some(Builtin::$variant), )*
                        _ => None,
                    },
                }
            }
        }
    };
}

define_builtins! {
    // Strings
    (Upper, "$str.upper", "upper"),
    (Lower, "$str.lower", "lower"),
    (Capitalize, "$str.capitalize", "capitalize"),
    (Trim, "$str.trim", "trim"),
    (Length, "$str.length", "length"),
    (Replace, "$str.replace", "replace"),

    // Dates
    (FormatDate, "$date.format", "formatDate"),
    (ParseDate, "$date.parse", "parseDate"),

    // Arrays
    (Join, "$array.join", "join"),
    (First, "$array.first", "first"),
    (Last, "$array.last", "last"),
    (Contains, "$array.contains", "contains"),

    // Numbers
    (Round, "$math.round", "round"),

    // Conditional
    (If, "$if", "if"),
}
