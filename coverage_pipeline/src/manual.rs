/*!

This is the long-form manual for `coverage_pipeline` and `covex`.

## Datasets

Two datasets are supported. Both are spreadsheets published by the WHO
preventive chemotherapy databank, with one row per country and year.

### `lf` Lymphatic Filariasis

Default file name: `LF_data.xlsx`. The following columns are required:

| column | use |
|--------|-----|
| `country` | country display name |
| `year` | reporting year |
| `region` | only `AFR` rows are kept, then dropped |
| `Population requiring PC for LF` | numeric |
| `Reported number of people treated` | numeric |
| `Programme (drug) coverage` | numeric, shown on the map |
| `Geographical coverage` | numeric |
| `National coverage` | numeric |

`Mapping status` is kept as text when present. `Current status of MDA`,
`country_code` and `Type of MDA` are dropped. Any other column is ignored.

### `sth` Soil Transmitted Helminthiasis

Default file name: `sth.xlsx`. Besides `country`, `year` and `region`, the
dataset has four numeric columns for each age band:

| Pre-SAC | SAC |
|---------|-----|
| `Population requiring PC for STH, Pre-SAC` | `Population requiring PC for STH, SAC` |
| `Reported number of Pre-SAC treated` | `Reported number of SAC treated` |
| `Programme coverage, Pre-SAC` | `Programme coverage, SAC` |
| `National coverage, Pre-SAC` | `National coverage, SAC` |

Queries on this dataset must name an age band (`pre-sac` or `sac`): the
charts, the table and the map only show the columns of that band.

## Cleaning rules

* Numeric cells are kept as they are. Text cells are parsed as numbers.
  Everything else (empty cells, `NA`, free text, errors) counts as `0`.
  Missing reports are treated as zero reported activity.
* A row without a country or a whole-number year cannot be placed in the
  table and is skipped with a warning.
* A source that lacks a required column is rejected as a whole.

## Selections

A selection is a list of countries and a range of years. The range is
half-open: `--years 2009:2019` keeps 2009 up to and including 2018, which
matches the published dashboard. Pass `--include-end-year` to keep 2019 as
well.

Unknown countries are ignored. Selecting no country is allowed and gives
empty charts and an empty table.

## Averages

The summary table holds, for each selected country, the mean of every
metric over the selected years. Values are rounded to two decimals, halves
away from zero (`0.125` becomes `0.13`).

## Maps

Two kinds of geographic output can be requested:
* points: with `--locations`, a CSV file `country,lat,lon` gives the position
  of each country,
* regions: with `--boundaries`, a GeoJSON file whose features carry the
  country name in the `admin` property.

Countries that cannot be found in these files are left out of the map.

## Configuration

All the options can be stored in a JSON file passed with `--config`:

```json
{
  "sources": [
    { "dataset": "lf", "filePath": "LF_data.xlsx" },
    { "dataset": "sth", "filePath": "sth.xlsx", "worksheet": "Sheet1" }
  ],
  "selection": {
    "countries": ["Mali", "Ethiopia"],
    "years": [2009, 2019],
    "ageBand": "pre-sac",
    "includeEndYear": false
  },
  "locationsPath": "countries.csv",
  "boundariesPath": "countries.geojson",
  "outputPath": "report.json",
  "includeRaw": true
}
```

Paths are relative to the configuration file. Command line flags take
precedence over the file.

*/
