//! Column names of the aggregator's published result schema plus the columns
//! this crate derives from it.

pub const ORGANIZATION_ID: &str = "OrganizationIdentifier";
pub const ORGANIZATION_NAME: &str = "OrganizationFormalName";
pub const ACTIVITY_ID: &str = "ActivityIdentifier";
pub const ACTIVITY_TYPE: &str = "ActivityTypeCode";
pub const LOCATION_ID: &str = "MonitoringLocationIdentifier";
pub const PROVIDER: &str = "ProviderName";
pub const ACTIVITY_MEDIA: &str = "ActivityMediaName";

pub const START_DATE: &str = "ActivityStartDate";
pub const START_TIME: &str = "ActivityStartTime/Time";
pub const START_TZ: &str = "ActivityStartTime/TimeZoneCode";

pub const CHARACTERISTIC: &str = "CharacteristicName";
pub const RESULT_VALUE: &str = "ResultMeasureValue";
pub const RESULT_UNIT: &str = "ResultMeasure/MeasureUnitCode";
pub const SAMPLE_FRACTION: &str = "ResultSampleFractionText";
pub const METHOD_SPECIATION: &str = "MethodSpecificationName";
pub const RESULT_STATUS: &str = "ResultStatusIdentifier";
pub const RESULT_ID: &str = "ResultIdentifier";
pub const WEIGHT_BASIS: &str = "ResultWeightBasisText";

pub const DEPTH_VALUE: &str = "ResultDepthHeightMeasure/MeasureValue";
pub const DEPTH_UNIT: &str = "ResultDepthHeightMeasure/MeasureUnitCode";

// Derived
pub const QA_FLAG: &str = "QA_flag";
pub const SPECIATION: &str = "Speciation";
pub const RESULT_COLUMN: &str = "Result_column";
pub const ACTIVITY_DATETIME: &str = "Activity_datetime";
pub const START_DATE_DISPLAY: &str = "StartDate";
pub const DEPTH: &str = "Depth";
pub const QA_PREFIX: &str = "QA";
pub const QA_COLLAPSE: &str = "QA_collapse";
/// Placement suffix for values whose row has no placement.
pub const UNPLACED: &str = "unplaced";

/// Columns this crate adds to a result table. No characteristic may be
/// placed under one of these names.
pub const DERIVED_COLUMNS: &[&str] = &[
    QA_FLAG,
    SPECIATION,
    RESULT_COLUMN,
    ACTIVITY_DATETIME,
    START_DATE_DISPLAY,
    DEPTH,
    QA_PREFIX,
    QA_COLLAPSE,
];

/// Columns that identify the row a result belongs to; kept in every table
/// the splitter produces.
pub const ROW_IDENTITY_COLUMNS: &[&str] = &[
    LOCATION_ID,
    ORGANIZATION_ID,
    ACTIVITY_ID,
    ACTIVITY_DATETIME,
    START_DATE_DISPLAY,
];

/// Result-level columns that describe a single characteristic's measurement
/// rather than the sampling event.
pub const CHARACTERISTIC_COLUMNS: &[&str] = &[
    START_DATE,
    START_TIME,
    START_TZ,
    "DataLoggerLine",
    "ResultDetectionConditionText",
    METHOD_SPECIATION,
    CHARACTERISTIC,
    SAMPLE_FRACTION,
    RESULT_VALUE,
    RESULT_UNIT,
    "MeasureQualifierCode",
    RESULT_STATUS,
    RESULT_ID,
    RESULT_COLUMN,
    "StatisticalBaseCode",
    "ResultValueTypeName",
    WEIGHT_BASIS,
    "ResultTimeBasisText",
    "ResultTemperatureBasisText",
    "ResultParticleSizeBasisText",
    "PrecisionValue",
    "DataQuality/BiasValue",
    "ConfidenceIntervalValue",
    "UpperConfidenceLimitValue",
    "LowerConfidenceLimitValue",
    "ResultCommentText",
    "USGSPCode",
    DEPTH_VALUE,
    DEPTH_UNIT,
    "ResultDepthAltitudeReferencePointText",
    "ResultSamplingPointName",
    "BiologicalIntentName",
    "BiologicalIndividualIdentifier",
    "SubjectTaxonomicName",
    "UnidentifiedSpeciesIdentifier",
    "SampleTissueAnatomyName",
    "GroupSummaryCountWeight/MeasureValue",
    "GroupSummaryCountWeight/MeasureUnitCode",
    "ResultAnalyticalMethod/MethodIdentifier",
    "ResultAnalyticalMethod/MethodIdentifierContext",
    "ResultAnalyticalMethod/MethodName",
    "ResultAnalyticalMethod/MethodUrl",
    "ResultAnalyticalMethod/MethodQualifierTypeName",
    "MethodDescriptionText",
    "LaboratoryName",
    "AnalysisStartDate",
    "AnalysisStartTime/Time",
    "AnalysisStartTime/TimeZoneCode",
    "AnalysisEndDate",
    "AnalysisEndTime/Time",
    "AnalysisEndTime/TimeZoneCode",
    "ResultLaboratoryCommentCode",
    "ResultLaboratoryCommentText",
    "DetectionQuantitationLimitTypeName",
    "DetectionQuantitationLimitMeasure/MeasureValue",
    "DetectionQuantitationLimitMeasure/MeasureUnitCode",
    "PreparationStartDate",
];

pub fn qa_column(placement: &str) -> String {
    prefixed(QA_PREFIX, placement)
}

pub fn prefixed(prefix: &str, placement: &str) -> String {
    format!("{prefix}_{placement}")
}
