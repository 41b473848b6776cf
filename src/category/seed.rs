//! Default taxonomy contents
//!
//! Installed by `seed_default_categories`. Administrators extend or edit
//! these afterwards; slugs are derived from the names.

use super::types::{CategoryValue, Taxonomy};

/// All default values, grouped by taxonomy.
pub fn default_categories() -> Vec<CategoryValue> {
    let groups: [(Taxonomy, &[(&str, &str)]); 6] = [
        (Taxonomy::GrowthHabit, GROWTH_HABITS),
        (Taxonomy::ClimateZone, CLIMATE_ZONES),
        (Taxonomy::HumanUse, HUMAN_USES),
        (Taxonomy::EcologicalRole, ECOLOGICAL_ROLES),
        (Taxonomy::SoilTexture, SOIL_TEXTURES),
        (Taxonomy::PropagationMethod, PROPAGATION_METHODS),
    ];

    groups
        .into_iter()
        .flat_map(|(taxonomy, values)| {
            values
                .iter()
                .map(move |(name, description)| CategoryValue::new(taxonomy, *name, *description))
        })
        .collect()
}

const GROWTH_HABITS: &[(&str, &str)] = &[
    (
        "Tree",
        "A woody perennial plant with a single main stem or trunk.",
    ),
    (
        "Shrub",
        "A woody plant with multiple stems and shorter height than a tree.",
    ),
    (
        "Herb",
        "A non-woody plant with soft, green stems.",
    ),
    (
        "Vine",
        "A climbing or trailing plant with long, slender stems.",
    ),
    (
        "Grass",
        "A monocotyledonous plant with narrow leaves and hollow stems.",
    ),
    (
        "Fern",
        "A flowerless, spore-bearing vascular plant.",
    ),
    (
        "Moss",
        "A small, non-vascular plant that grows in dense green clumps.",
    ),
];

const CLIMATE_ZONES: &[(&str, &str)] = &[
    (
        "Tropical rainforest climate",
        "Average precipitation of at least 60 mm in every month.",
    ),
    (
        "Tropical monsoon climate",
        "Driest month with precipitation less than 60 mm, but at least 100 - (Total Annual Precipitation (mm) / 25).",
    ),
    (
        "Tropical wet and dry or savanna climate (dry winter)",
        "Driest month having precipitation less than 60 mm and less than 100 - (Total Annual Precipitation (mm) / 25).",
    ),
    (
        "Tropical wet and dry or savanna climate (dry summer)",
        "Driest month having precipitation less than 60 mm and less than 100 - (Total Annual Precipitation (mm) / 25).",
    ),
    (
        "Hot desert climate",
        "Annual precipitation less than 50% of the threshold for a desert climate.",
    ),
    (
        "Cold desert climate",
        "Annual precipitation less than 50% of the threshold for a desert climate.",
    ),
    (
        "Hot semi-arid climate",
        "Annual precipitation between 50% and 100% of the threshold for a desert climate.",
    ),
    (
        "Cold semi-arid climate",
        "Annual precipitation between 50% and 100% of the threshold for a desert climate.",
    ),
    (
        "Humid subtropical climate",
        "Coldest month averaging above 0°C, at least one month's average temperature above 22°C, and at least four months averaging above 10°C. No significant precipitation difference between seasons.",
    ),
    (
        "Temperate oceanic climate or subtropical highland climate",
        "Coldest month averaging above 0°C, all months with average temperatures below 22°C, and at least four months averaging above 10°C. No significant precipitation difference between seasons.",
    ),
    (
        "Subpolar oceanic climate",
        "Coldest month averaging above 0°C and 1-3 months averaging above 10°C. No significant precipitation difference between seasons.",
    ),
    (
        "Monsoon-influenced humid subtropical climate",
        "Coldest month averaging above 0°C, at least one month's average temperature above 22°C, and at least four months averaging above 10°C. At least ten times as much rain in the wettest month of summer as in the driest month of winter.",
    ),
    (
        "Subtropical highland climate or Monsoon-influenced temperate oceanic climate",
        "Coldest month averaging above 0°C, all months with average temperatures below 22°C, and at least four months averaging above 10°C. At least ten times as much rain in the wettest month of summer as in the driest month of winter.",
    ),
    (
        "Cold subtropical highland climate or Monsoon-influenced subpolar oceanic climate",
        "Coldest month averaging above 0°C and 1-3 months averaging above 10°C. At least ten times as much rain in the wettest month of summer as in the driest month of winter.",
    ),
    (
        "Hot-summer Mediterranean climate",
        "Coldest month averaging above 0°C, at least one month's average temperature above 22°C, and at least four months averaging above 10°C. At least three times as much precipitation in the wettest month of winter as in the driest month of summer, and the driest month of summer receives less than 40 mm.",
    ),
    (
        "Warm-summer Mediterranean climate",
        "Coldest month averaging above 0°C, all months with average temperatures below 22°C, and at least four months averaging above 10°C. At least three times as much precipitation in the wettest month of winter as in the driest month of summer, and the driest month of summer receives less than 40 mm.",
    ),
    (
        "Cold-summer Mediterranean climate",
        "Coldest month averaging above 0°C and 1-3 months averaging above 10°C. At least three times as much precipitation in the wettest month of winter as in the driest month of summer, and the driest month of summer receives less than 40 mm.",
    ),
    (
        "Hot-summer humid continental climate",
        "Coldest month averaging below 0°C, at least one month's average temperature above 22°C, and at least four months averaging above 10°C. No significant precipitation difference between seasons.",
    ),
    (
        "Warm-summer humid continental climate",
        "Coldest month averaging below 0°C, all months with average temperatures below 22°C, and at least four months averaging above 10°C. No significant precipitation difference between seasons.",
    ),
    (
        "Subarctic climate",
        "Coldest month averaging below 0°C and 1-3 months averaging above 10°C. No significant precipitation difference between seasons.",
    ),
    (
        "Extremely cold subarctic climate",
        "Coldest month averaging below -38°C and 1-3 months averaging above 10°C. No significant precipitation difference between seasons.",
    ),
    (
        "Monsoon-influenced hot-summer humid continental climate",
        "Coldest month averaging below 0°C, at least one month's average temperature above 22°C, and at least four months averaging above 10°C. At least ten times as much rain in the wettest month of summer as in the driest month of winter.",
    ),
    (
        "Monsoon-influenced warm-summer humid continental climate",
        "Coldest month averaging below 0°C, all months with average temperatures below 22°C, and at least four months averaging above 10°C. At least ten times as much rain in the wettest month of summer as in the driest month of winter.",
    ),
    (
        "Monsoon-influenced subarctic climate",
        "Coldest month averaging below 0°C and 1-3 months averaging above 10°C. At least ten times as much rain in the wettest month of summer as in the driest month of winter.",
    ),
    (
        "Monsoon-influenced extremely cold subarctic climate",
        "Coldest month averaging below -38°C and 1-3 months averaging above 10°C. At least ten times as much rain in the wettest month of summer as in the driest month of winter.",
    ),
    (
        "Mediterranean-influenced hot-summer humid continental climate",
        "Coldest month averaging below 0°C, average temperature of the warmest month above 22°C and at least four months averaging above 10°C. At least three times as much precipitation in the wettest month of winter as in the driest month of summer, and the driest month of summer receives less than 30 mm.",
    ),
    (
        "Mediterranean-influenced warm-summer humid continental climate",
        "Coldest month averaging below 0°C, average temperature of the warmest month below 22°C and at least four months averaging above 10°C. At least three times as much precipitation in the wettest month of winter as in the driest month of summer, and the driest month of summer receives less than 30 mm.",
    ),
    (
        "Mediterranean-influenced subarctic climate",
        "Coldest month averaging below 0°C and 1-3 months averaging above 10°C. At least three times as much precipitation in the wettest month of winter as in the driest month of summer, and the driest month of summer receives less than 30 mm.",
    ),
    (
        "Mediterranean-influenced extremely cold subarctic climate",
        "Coldest month averaging below -38°C and 1-3 months averaging above 10°C. At least three times as much precipitation in the wettest month of winter as in the driest month of summer, and the driest month of summer receives less than 30 mm.",
    ),
    (
        "Tundra climate",
        "Average temperature of warmest month between 0°C and 10°C.",
    ),
    (
        "Ice cap climate",
        "Eternal winter, with all 12 months of the year with average temperatures below 0°C.",
    ),
];

const HUMAN_USES: &[(&str, &str)] = &[
    (
        "Edible Fruits",
        "The plant produces edible fruits that can be consumed by humans. Fruits provide nutritional value and can contribute to food security and income generation.",
    ),
    (
        "Edible Nuts",
        "The plant produces edible nuts that are nutritious and can be consumed raw or processed. Nuts are a valuable food source and can have commercial value.",
    ),
    (
        "Edible Seeds",
        "The seeds of the plant are edible and can be used in various culinary applications. Edible seeds can provide nutrition and have cultural significance.",
    ),
    (
        "Edible Leaves",
        "The leaves of the plant are edible and can be used in salads or cooked dishes. Edible leaves offer dietary diversity and can have cultural significance in traditional cuisines.",
    ),
    (
        "Honey Production",
        "The plant provides nectar and pollen for bees, supporting honey production. Honey is a valuable food product with nutritional and medicinal properties.",
    ),
    (
        "Medicinal Roots",
        "The roots of the plant have medicinal properties and can be used for various health benefits. Medicinal roots can support traditional healthcare practices.",
    ),
    (
        "Medicinal Flowers",
        "The flowers of the plant have medicinal properties and can be used for various health benefits. Medicinal flowers can offer unique therapeutic value.",
    ),
    (
        "Medicinal Bark",
        "The bark of the plant has medicinal properties and can be used for various health benefits. Medicinal bark can contribute to community health and have socio-economic value.",
    ),
    (
        "Medicinal Leaves",
        "The leaves of the plant have medicinal properties and can be used for various health benefits. Medicinal leaves can provide accessible healthcare options and support traditional knowledge.",
    ),
    (
        "Timber",
        "The plant provides valuable timber for construction and woodworking. Timber production can generate income and support local industries.",
    ),
    (
        "Animal Fodder",
        "The plant can be used as fodder for livestock or other animals. Animal fodder supports animal husbandry and can provide supplementary income for farmers.",
    ),
    (
        "Firewood",
        "The wood of the plant can be used as firewood for cooking and heating. Fuelwood is a vital resource for many households and can reduce dependence on fossil fuels.",
    ),
    (
        "Fiber",
        "The plant provides fiber that can be used for making textiles, ropes, or other materials. Fiber production can support local crafts and industries.",
    ),
    (
        "Dye",
        "The plant produces natural dyes that can be used for coloring textiles or other materials. Natural dyes have cultural and eco-friendly value.",
    ),
    (
        "Resin",
        "The plant produces resin that can be used for various purposes, such as adhesives, varnishes, or incense. Resin production can have economic and cultural significance.",
    ),
    (
        "Ornamental Flowers",
        "The plant produces beautiful flowers that are used for ornamental purposes. Ornamental flowers can enhance landscapes, have cultural significance, and contribute to eco-tourism.",
    ),
    (
        "Ornamental Foliage",
        "The plant has attractive foliage that is used for ornamental purposes. Ornamental foliage can beautify spaces and have aesthetic value.",
    ),
    (
        "Ornamental Bark",
        "The bark of the plant has an attractive appearance and is used for ornamental purposes. Ornamental bark can add visual interest to landscapes.",
    ),
    (
        "Hedge",
        "The plant can be used as a hedge or border plant for landscaping. Hedges provide structure, privacy, and can have ecological benefits.",
    ),
];

const ECOLOGICAL_ROLES: &[(&str, &str)] = &[
    (
        "Nitrogen Fixation",
        "The plant has the ability to fix atmospheric nitrogen in the soil, improving soil fertility and benefiting other plants.",
    ),
    (
        "Soil Erosion Control",
        "The plant helps to stabilize the soil and prevent erosion, particularly in sloping or degraded landscapes.",
    ),
    (
        "Water Regulation",
        "The plant contributes to the regulation of water flow and retention in the ecosystem, helping to maintain water balance.",
    ),
    (
        "Carbon Sequestration",
        "The plant absorbs and stores carbon dioxide from the atmosphere, contributing to climate change mitigation.",
    ),
    (
        "Habitat Provision",
        "The plant provides habitat and shelter for various wildlife species, promoting biodiversity conservation.",
    ),
    (
        "Pollinator Attraction",
        "The plant attracts pollinators such as bees, butterflies, and birds, supporting pollination services in the ecosystem.",
    ),
    (
        "Pest and Disease Control",
        "The plant possesses natural pest and disease resistance properties, helping to control the spread of harmful organisms.",
    ),
    (
        "Soil Quality Improvement",
        "The plant contributes to the improvement of soil structure, fertility, and organic matter content.",
    ),
    (
        "Microclimate Regulation",
        "The plant helps to regulate the microclimate by providing shade, reducing wind speed, and moderating temperature.",
    ),
    (
        "Nutrient Cycling",
        "The plant plays a role in the cycling of nutrients within the ecosystem, contributing to the overall health and productivity.",
    ),
    (
        "Windbreak",
        "The plant can be used as a windbreak to reduce wind speed and protect crops or structures, providing ecological benefits.",
    ),
    (
        "Shade Provision",
        "The plant provides shade, creating favorable conditions for other species and regulating the understory environment.",
    ),
    (
        "Soil Moisture Retention",
        "The plant helps to retain soil moisture, reducing water loss and improving water availability for other plants.",
    ),
    (
        "Weed Suppression",
        "The plant has the ability to suppress the growth of weeds through allelopathic effects or by outcompeting them.",
    ),
    (
        "Soil Nutrient Accumulation",
        "The plant accumulates and stores nutrients in its biomass, which can be released back into the soil upon decomposition.",
    ),
];

const SOIL_TEXTURES: &[(&str, &str)] = &[
    (
        "Sandy",
        "Soil with a gritty texture, good drainage but low nutrient and water retention.",
    ),
    (
        "Loamy",
        "Soil with a balanced mix of sand, silt, and clay, offering good drainage, nutrient availability, and moisture retention.",
    ),
    (
        "Clayey",
        "Soil with fine particles, high water retention, and nutrient levels but poor drainage.",
    ),
    (
        "Silty",
        "Soil with fine particles that retain moisture and nutrients well but may have poor drainage.",
    ),
    (
        "Peaty",
        "Soil high in organic matter, retaining moisture well but may be acidic.",
    ),
    (
        "Chalky",
        "Alkaline soil with high calcium carbonate content, often stony and free-draining.",
    ),
    (
        "Saline",
        "Soil with high salt content, usually found in arid or coastal areas.",
    ),
];

const PROPAGATION_METHODS: &[(&str, &str)] = &[
    (
        "Seed Propagation",
        "Propagation through the sowing of seeds. Includes direct seeding and seedling transplants.",
    ),
    (
        "Cuttings",
        "Vegetative propagation method using parts of plants (softwood, hardwood, semi-hardwood cuttings) to grow new plants.",
    ),
    (
        "Layering",
        "Propagation technique where a branch is encouraged to form roots while still attached to the parent plant. Includes air layering and ground layering.",
    ),
    (
        "Grafting",
        "Joining parts of two plants so that they grow as one. Includes cleft grafting, bud grafting, and whip and tongue grafting.",
    ),
    (
        "Division",
        "Propagation by dividing the root, rhizome, tuber, or other parts of the plant into sections that each become new plants.",
    ),
    (
        "Micropropagation (Tissue Culture)",
        "Propagation of plants by growing plant cells, tissues, or organs in a sterile environment on a nutrient culture medium.",
    ),
    (
        "Suckering",
        "Propagation through new shoots that grow from the base or roots of the parent plant.",
    ),
    (
        "Stoloniferous Propagation",
        "Propagation using stolons, which are horizontal above-ground stems that produce new plants at the nodes.",
    ),
    (
        "Rhizomatous Propagation",
        "Propagation using rhizomes, which are horizontal underground stems that produce new plants.",
    ),
    (
        "Bulb and Tuber Propagation",
        "Propagation using bulbs or tubers, such as those of onions, garlic, and potatoes.",
    ),
];
