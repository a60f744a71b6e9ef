//! The closed canonical taxonomy: Category -> Subcategory -> Type.
//!
//! This table is the sole source of truth for valid classifications (the
//! "static" half of C1). It is hard-coded rather than loaded from a file
//! or database, mirroring how the teacher bakes default configuration
//! tables directly into source.

/// A category and its subcategories, each with their list of types.
pub struct CategoryEntry {
    /// Canonical category name.
    pub category: &'static str,
    /// Subcategories under this category, each paired with its types.
    pub subcategories: &'static [SubcategoryEntry],
}

/// A subcategory and its closed list of question types.
pub struct SubcategoryEntry {
    /// Canonical subcategory name.
    pub subcategory: &'static str,
    /// Types of question recognized under this subcategory.
    pub types: &'static [&'static str],
}

/// The full canonical taxonomy: 5 categories, 33 subcategories.
pub const TAXONOMY: &[CategoryEntry] = &[
    CategoryEntry {
        category: "Arithmetic",
        subcategories: &[
            SubcategoryEntry {
                subcategory: "Time-Speed-Distance",
                types: &[
                    "Basics",
                    "Relative Speed",
                    "Circular Track Motion",
                    "Boats and Streams",
                    "Trains",
                    "Races",
                ],
            },
            SubcategoryEntry {
                subcategory: "Time-Work",
                types: &["Work Time Effeciency", "Pipes and Cisterns", "Work Equivalence"],
            },
            SubcategoryEntry {
                subcategory: "Ratios and Proportions",
                types: &[
                    "Simple Rations",
                    "Compound Ratios",
                    "Direct and Inverse Variation",
                    "Partnerships",
                ],
            },
            SubcategoryEntry {
                subcategory: "Percentages",
                types: &["Basics", "Percentage Change", "Successive Percentage Change"],
            },
            SubcategoryEntry {
                subcategory: "Averages and Alligation",
                types: &[
                    "Basic Averages",
                    "Weighted Averages",
                    "Alligations & Mixtures",
                    "Three Mixture Alligations",
                ],
            },
            SubcategoryEntry {
                subcategory: "Profit-Loss-Discount",
                types: &[
                    "Basics",
                    "Successive Profit/Loss/Discounts",
                    "Marked Price and Cost Price Relations",
                    "Discount Chains",
                ],
            },
            SubcategoryEntry {
                subcategory: "Simple and Compound Interest",
                types: &[
                    "Basics",
                    "Difference between Simple Interest and Compound Interests",
                    "Fractional Time Period Compound Interest",
                ],
            },
            SubcategoryEntry {
                subcategory: "Mixtures and Solutions",
                types: &["Replacements", "Concentration Change", "Solid-Liquid-Gas Mixtures"],
            },
            SubcategoryEntry {
                subcategory: "Partnerships",
                types: &["Profit share"],
            },
        ],
    },
    CategoryEntry {
        category: "Algebra",
        subcategories: &[
            SubcategoryEntry {
                subcategory: "Linear Equations",
                types: &[
                    "Two variable systems",
                    "Three variable systems",
                    "Dependent and Inconsistent Systems",
                ],
            },
            SubcategoryEntry {
                subcategory: "Quadratic Equations",
                types: &[
                    "Roots & Nature of Roots",
                    "Sum and Product of Roots",
                    "Maximum and Minimum Values",
                ],
            },
            SubcategoryEntry {
                subcategory: "Inequalities",
                types: &[
                    "Linear Inequalities",
                    "Quadratic Inequalities",
                    "Modulus and Absolute Value",
                    "Arithmetic Mean",
                    "Geometric Mean",
                    "Cauchy Schwarz",
                ],
            },
            SubcategoryEntry {
                subcategory: "Progressions",
                types: &[
                    "Arithmetic Progression",
                    "Geometric Progression",
                    "Harmonic Progression",
                    "Mixed Progressions",
                ],
            },
            SubcategoryEntry {
                subcategory: "Functions and Graphs",
                types: &[
                    "Linear Functions",
                    "Quadratic Functions",
                    "Polynomial Functions",
                    "Modulus Functions",
                    "Step Functions",
                    "Transformations",
                    "Domain Range",
                    "Composition and Inverse Functions",
                ],
            },
            SubcategoryEntry {
                subcategory: "Logarithms and Exponents",
                types: &[
                    "Basics",
                    "Change of Base Formula",
                    "Soliving Log Equations",
                    "Surds and Indices",
                ],
            },
            SubcategoryEntry {
                subcategory: "Special Algebraic Identities",
                types: &["Expansion and Factorisation", "Cubes and Squares", "Binomial Theorem"],
            },
            SubcategoryEntry {
                subcategory: "Maxima and Minima",
                types: &["Optimsation with Algebraic Expressions"],
            },
            SubcategoryEntry {
                subcategory: "Special Polynomials",
                types: &["Remainder Theorem", "Factor Theorem"],
            },
        ],
    },
    CategoryEntry {
        category: "Geometry and Mensuration",
        subcategories: &[
            SubcategoryEntry {
                subcategory: "Triangles",
                types: &[
                    "Properties (Angles, Sides, Medians, Bisectors)",
                    "Congruence & Similarity",
                    "Pythagoras & Converse",
                    "Inradius, Circumradius, Orthocentre",
                ],
            },
            SubcategoryEntry {
                subcategory: "Circles",
                types: &["Tangents & Chords", "Angles in a Circle", "Cyclic Quadrilaterals"],
            },
            SubcategoryEntry {
                subcategory: "Polygons",
                types: &["Regular Polygons", "Interior / Exterior Angles"],
            },
            SubcategoryEntry {
                subcategory: "Coordinate Geometry",
                types: &[
                    "Distance",
                    "Section Formula",
                    "Midpoint",
                    "Equation of a line",
                    "Slope & Intercepts",
                    "Circles in Coordinate Plane",
                    "Parabola",
                    "Ellipse",
                    "Hyperbola",
                ],
            },
            SubcategoryEntry {
                subcategory: "Mensuration 2D",
                types: &["Area Triangle", "Area Rectangle", "Area Trapezium", "Area Circle", "Sector"],
            },
            SubcategoryEntry {
                subcategory: "Mensuration 3D",
                types: &[
                    "Volume Cubes",
                    "Volume Cuboid",
                    "Volume Cylinder",
                    "Volume Cone",
                    "Volume Sphere",
                    "Volume Hemisphere",
                    "Surface Areas",
                ],
            },
            SubcategoryEntry {
                subcategory: "Trigonometry",
                types: &["Heights and Distances", "Basic Trigonometric Ratios"],
            },
        ],
    },
    CategoryEntry {
        category: "Number System",
        subcategories: &[
            SubcategoryEntry {
                subcategory: "Divisibility",
                types: &["Basic Divisibility Rules", "Factorisation of Integers"],
            },
            SubcategoryEntry {
                subcategory: "HCF-LCM",
                types: &["Euclidean Algorithm", "Product of HCF and LCM"],
            },
            SubcategoryEntry {
                subcategory: "Remainders",
                types: &[
                    "Basic Remainder Theorem",
                    "Chinese Remainder Theorem",
                    "Cyclicity of Remainders (Last Digits)",
                    "Cyclicity of Remainders (Last Two Digits)",
                ],
            },
            SubcategoryEntry {
                subcategory: "Base Systems",
                types: &["Conversion between bases", "Arithmetic in different bases"],
            },
            SubcategoryEntry {
                subcategory: "Digit Properties",
                types: &["Sum of Digits", "Last Digit Patterns", "Palindromes", "Repetitive Digits"],
            },
            SubcategoryEntry {
                subcategory: "Number Properties",
                types: &["Perfect Squares", "Perfect Cubes"],
            },
            SubcategoryEntry {
                subcategory: "Number Series",
                types: &["Sum of Squares", "Sum of Cubes", "Telescopic Series"],
            },
            SubcategoryEntry {
                subcategory: "Factorials",
                types: &["Properties of Factorials"],
            },
        ],
    },
    CategoryEntry {
        category: "Modern Math",
        subcategories: &[
            SubcategoryEntry {
                subcategory: "Permutation-Combination",
                types: &[
                    "Basics",
                    "Circular Permutations",
                    "Permutations with Repetitions",
                    "Permutations with Restrictions",
                    "Combinations with Repetitions",
                    "Combinations with Restrictions",
                ],
            },
            SubcategoryEntry {
                subcategory: "Probability",
                types: &["Classical Probability", "Conditional Probability", "Bayes' Theorem"],
            },
            SubcategoryEntry {
                subcategory: "Set Theory and Venn Diagram",
                types: &["Union and Intersection", "Complement and Difference of Sets", "Multi Set Problems"],
            },
        ],
    },
];

/// Legacy subcategory names no longer emitted by enrichment prompts but
/// still resolvable for backward compatibility with older stored rows.
pub const LEGACY_SUBCATEGORY_CATEGORY: &[(&str, &str)] = &[
    ("Time–Speed–Distance (TSD)", "Arithmetic"),
    ("Time & Work", "Arithmetic"),
    ("Speed-Time-Distance", "Arithmetic"),
    ("Basic Arithmetic", "Arithmetic"),
    ("Powers and Roots", "Algebra"),
    ("Perimeter and Area", "Geometry and Mensuration"),
    ("Basic Operations", "Number System"),
    ("HCF–LCM", "Number System"),
    ("Remainders & Modular Arithmetic", "Number System"),
    ("Permutation–Combination (P&C)", "Modern Math"),
    ("Set Theory & Venn Diagrams", "Modern Math"),
];

/// Baseline category quotas for a 12-question pack (§4.7). Sums to 12.
pub const BASELINE_CATEGORY_QUOTAS: &[(&str, u32)] = &[
    ("Arithmetic", 4),
    ("Algebra", 3),
    ("Geometry and Mensuration", 3),
    ("Number System", 1),
    ("Modern Math", 1),
];
